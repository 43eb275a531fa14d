use sqlx::{PgExecutor, PgPool, types::Json};
use uuid::Uuid;

use quarry_domain::{plan::SearchQueryDef, topic::Topic, unit::KnowledgeUnit};

use crate::{
	Error, Result,
	models::{
		KnowledgeUnitRow, SearchQueryRow, StoredUnit, TopicRow, UnitListQuery, UnitPage,
		UpsertAction, UpsertOutcome,
	},
};

const UNIT_COLUMNS: &str = "\
unit_id,
	topic_id,
	run_id,
	kind,
	title,
	summary_text,
	key_points,
	language,
	date_at,
	date_unknown,
	verification_url,
	canonical_url,
	dedup_key,
	fingerprint,
	identifiers,
	matched_terms,
	matched_term_ids,
	retriever_query,
	rank_score,
	source_system,
	site_id,
	retriever_name,
	retriever_version,
	retrieved_at,
	attrs,
	raw_payload_ref,
	content_ref,
	status,
	duplicate_of,
	created_at,
	updated_at";

pub async fn upsert_topic<'e, E>(executor: E, topic: &Topic) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO topics (
	topic_id,
	title,
	languages,
	retrievers,
	keyword_pool,
	must_pool,
	exclude_pool
)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (topic_id) DO UPDATE
SET
	title = EXCLUDED.title,
	languages = EXCLUDED.languages,
	retrievers = EXCLUDED.retrievers,
	keyword_pool = EXCLUDED.keyword_pool,
	must_pool = EXCLUDED.must_pool,
	exclude_pool = EXCLUDED.exclude_pool,
	updated_at = now()",
	)
	.bind(topic.topic_id)
	.bind(topic.title.as_str())
	.bind(&topic.languages)
	.bind(&topic.retrievers)
	.bind(Json(&topic.keyword_pool))
	.bind(Json(&topic.must_pool))
	.bind(Json(&topic.exclude_pool))
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_topic<'e, E>(executor: E, topic_id: Uuid) -> Result<Option<Topic>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, TopicRow>(
		"\
SELECT
	topic_id,
	title,
	languages,
	retrievers,
	keyword_pool,
	must_pool,
	exclude_pool
FROM topics
WHERE topic_id = $1",
	)
	.bind(topic_id)
	.fetch_optional(executor)
	.await?;

	Ok(row.map(Topic::from))
}

pub async fn insert_search_query<'e, E>(
	executor: E,
	topic_id: Uuid,
	query: &SearchQueryDef,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let query_model = serde_json::to_value(&query.query_model)
		.map_err(|err| Error::InvalidArgument(format!("query_model is not serializable: {err}")))?;
	let target = query
		.target
		.map(i32::try_from)
		.transpose()
		.map_err(|_| Error::InvalidArgument("target is out of range.".to_string()))?;

	sqlx::query(
		"\
INSERT INTO topic_search_queries (
	query_id,
	topic_id,
	order_index,
	title,
	query_model,
	target,
	enabled_retrievers,
	enabled
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
	)
	.bind(query.query_id)
	.bind(topic_id)
	.bind(query.order_index)
	.bind(query.title.as_deref())
	.bind(query_model)
	.bind(target)
	.bind(query.enabled_retrievers.clone())
	.bind(query.enabled)
	.execute(executor)
	.await?;

	Ok(())
}

/// Enabled search definitions of a topic in ascending order index.
pub async fn list_search_queries<'e, E>(executor: E, topic_id: Uuid) -> Result<Vec<SearchQueryDef>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, SearchQueryRow>(
		"\
SELECT
	query_id,
	order_index,
	title,
	query_model,
	target,
	enabled_retrievers,
	enabled
FROM topic_search_queries
WHERE topic_id = $1 AND enabled
ORDER BY order_index ASC, created_at ASC, query_id ASC",
	)
	.bind(topic_id)
	.fetch_all(executor)
	.await?;

	rows.into_iter().map(SearchQueryDef::try_from).collect()
}

/// Inserts the unit or merges it into the row holding the same `(topic_id, dedup_key)`.
///
/// On conflict only empty columns are filled; `updated_at` is always refreshed.
pub async fn upsert_unit<'e, E>(executor: E, unit: &KnowledgeUnit) -> Result<UpsertOutcome>
where
	E: PgExecutor<'e>,
{
	let dedup_key = required(unit.dedup_key.as_deref(), "dedup_key")?;
	let fingerprint = required(unit.fingerprint.as_deref(), "fingerprint")?;
	let (unit_id, inserted): (Uuid, bool) = sqlx::query_as(
		"\
INSERT INTO knowledge_units (
	unit_id,
	topic_id,
	run_id,
	kind,
	title,
	summary_text,
	key_points,
	language,
	date_at,
	date_unknown,
	verification_url,
	canonical_url,
	dedup_key,
	fingerprint,
	identifiers,
	matched_terms,
	matched_term_ids,
	retriever_query,
	rank_score,
	source_system,
	site_id,
	retriever_name,
	retriever_version,
	retrieved_at,
	attrs,
	raw_payload_ref,
	content_ref,
	status,
	duplicate_of,
	created_at,
	updated_at
)
VALUES (
	$1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
	$11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
	$21, $22, $23, $24, $25, $26, $27, $28, $29, now(), now()
)
ON CONFLICT (topic_id, dedup_key) DO UPDATE
SET
	summary_text = CASE
		WHEN btrim(knowledge_units.summary_text) = '' THEN EXCLUDED.summary_text
		ELSE knowledge_units.summary_text
	END,
	canonical_url = CASE
		WHEN btrim(coalesce(knowledge_units.canonical_url, '')) = '' THEN
			coalesce(EXCLUDED.canonical_url, knowledge_units.canonical_url)
		ELSE knowledge_units.canonical_url
	END,
	language = CASE
		WHEN btrim(coalesce(knowledge_units.language, '')) = '' THEN
			coalesce(EXCLUDED.language, knowledge_units.language)
		ELSE knowledge_units.language
	END,
	date_at = coalesce(knowledge_units.date_at, EXCLUDED.date_at),
	date_unknown = coalesce(knowledge_units.date_at, EXCLUDED.date_at) IS NULL
		AND (knowledge_units.date_unknown OR EXCLUDED.date_unknown),
	retriever_query = CASE
		WHEN btrim(coalesce(knowledge_units.retriever_query, '')) = '' THEN
			coalesce(EXCLUDED.retriever_query, knowledge_units.retriever_query)
		ELSE knowledge_units.retriever_query
	END,
	rank_score = coalesce(knowledge_units.rank_score, EXCLUDED.rank_score),
	site_id = coalesce(knowledge_units.site_id, EXCLUDED.site_id),
	retriever_version = CASE
		WHEN btrim(coalesce(knowledge_units.retriever_version, '')) = '' THEN
			coalesce(EXCLUDED.retriever_version, knowledge_units.retriever_version)
		ELSE knowledge_units.retriever_version
	END,
	raw_payload_ref = coalesce(knowledge_units.raw_payload_ref, EXCLUDED.raw_payload_ref),
	content_ref = CASE
		WHEN btrim(coalesce(knowledge_units.content_ref, '')) = '' THEN
			coalesce(EXCLUDED.content_ref, knowledge_units.content_ref)
		ELSE knowledge_units.content_ref
	END,
	key_points = CASE
		WHEN cardinality(knowledge_units.key_points) = 0 THEN EXCLUDED.key_points
		ELSE knowledge_units.key_points
	END,
	identifiers = CASE
		WHEN jsonb_array_length(knowledge_units.identifiers) = 0 THEN EXCLUDED.identifiers
		ELSE knowledge_units.identifiers
	END,
	matched_terms = CASE
		WHEN cardinality(knowledge_units.matched_terms) = 0 THEN EXCLUDED.matched_terms
		ELSE knowledge_units.matched_terms
	END,
	matched_term_ids = CASE
		WHEN cardinality(knowledge_units.matched_term_ids) = 0 THEN EXCLUDED.matched_term_ids
		ELSE knowledge_units.matched_term_ids
	END,
	attrs = CASE
		WHEN knowledge_units.attrs = '{}'::jsonb THEN EXCLUDED.attrs
		ELSE knowledge_units.attrs
	END,
	updated_at = now()
RETURNING unit_id, (xmax = 0) AS inserted",
	)
	.bind(Uuid::new_v4())
	.bind(unit.topic_id)
	.bind(unit.run_id)
	.bind(unit.kind.as_str())
	.bind(unit.title.as_str())
	.bind(unit.summary_text.as_str())
	.bind(&unit.key_points)
	.bind(unit.language.as_deref())
	.bind(unit.date_at)
	.bind(unit.date_unknown)
	.bind(unit.verification_url.as_str())
	.bind(unit.canonical_url.as_deref())
	.bind(dedup_key)
	.bind(fingerprint)
	.bind(Json(&unit.identifiers))
	.bind(&unit.matched_terms)
	.bind(&unit.matched_term_ids)
	.bind(unit.retriever_query.as_deref())
	.bind(unit.rank_score)
	.bind(unit.source_system.as_str())
	.bind(unit.site_id)
	.bind(unit.retriever_name.as_str())
	.bind(unit.retriever_version.as_deref())
	.bind(unit.retrieved_at)
	.bind(Json(&unit.attrs))
	.bind(unit.raw_payload_ref)
	.bind(unit.content_ref.as_deref())
	.bind(unit.status.as_str())
	.bind(unit.duplicate_of)
	.fetch_one(executor)
	.await?;
	let action = if inserted { UpsertAction::Inserted } else { UpsertAction::Merged };

	Ok(UpsertOutcome { unit_id, action })
}

pub async fn get_unit<'e, E>(
	executor: E,
	topic_id: Uuid,
	dedup_key: &str,
) -> Result<Option<StoredUnit>>
where
	E: PgExecutor<'e>,
{
	let sql = format!(
		"\
SELECT
	{UNIT_COLUMNS}
FROM knowledge_units
WHERE topic_id = $1 AND dedup_key = $2"
	);
	let row = sqlx::query_as::<_, KnowledgeUnitRow>(&sql)
		.bind(topic_id)
		.bind(dedup_key)
		.fetch_optional(executor)
		.await?;

	row.map(StoredUnit::try_from).transpose()
}

/// Newest-first page of a topic's units, optionally narrowed by kind and status.
pub async fn list_units(pool: &PgPool, query: &UnitListQuery) -> Result<UnitPage> {
	let kind = query.kind.map(|kind| kind.as_str());
	let status = query.status.map(|status| status.as_str());
	let total: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM knowledge_units
WHERE topic_id = $1
	AND ($2::text IS NULL OR kind = $2)
	AND ($3::text IS NULL OR status = $3)",
	)
	.bind(query.topic_id)
	.bind(kind)
	.bind(status)
	.fetch_one(pool)
	.await?;
	let sql = format!(
		"\
SELECT
	{UNIT_COLUMNS}
FROM knowledge_units
WHERE topic_id = $1
	AND ($2::text IS NULL OR kind = $2)
	AND ($3::text IS NULL OR status = $3)
ORDER BY retrieved_at DESC, unit_id ASC
LIMIT $4
OFFSET $5"
	);
	let rows = sqlx::query_as::<_, KnowledgeUnitRow>(&sql)
		.bind(query.topic_id)
		.bind(kind)
		.bind(status)
		.bind(i64::from(query.effective_limit()))
		.bind(i64::from(query.offset))
		.fetch_all(pool)
		.await?;
	let items = rows.into_iter().map(StoredUnit::try_from).collect::<Result<Vec<_>>>()?;

	Ok(UnitPage { items, total: u64::try_from(total).unwrap_or_default() })
}

/// Flags `unit_id` as a duplicate of `master_id`. Both must belong to the same topic.
pub async fn mark_duplicate<'e, E>(executor: E, unit_id: Uuid, master_id: Uuid) -> Result<()>
where
	E: PgExecutor<'e>,
{
	if unit_id == master_id {
		return Err(Error::InvalidArgument("A unit cannot duplicate itself.".to_string()));
	}

	let result = sqlx::query(
		"\
UPDATE knowledge_units
SET
	status = 'duplicate',
	duplicate_of = $2,
	updated_at = now()
WHERE unit_id = $1
	AND EXISTS (
		SELECT 1
		FROM knowledge_units master
		WHERE master.unit_id = $2 AND master.topic_id = knowledge_units.topic_id
	)",
	)
	.bind(unit_id)
	.bind(master_id)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!(
			"unit {unit_id} or master {master_id} in the same topic"
		)));
	}

	Ok(())
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
	value
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.ok_or_else(|| Error::InvalidArgument(format!("{field} must be set before persisting.")))
}
