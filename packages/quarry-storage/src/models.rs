use serde_json::{Map, Value};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use quarry_domain::{
	plan::SearchQueryDef,
	query::QueryModel,
	terms::PoolTerm,
	topic::Topic,
	unit::{Identifier, KnowledgeUnit, UnitKind, UnitStatus},
};

use crate::Error;

pub const LIST_LIMIT_MAX: u32 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertAction {
	Inserted,
	Merged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpsertOutcome {
	pub unit_id: Uuid,
	pub action: UpsertAction,
}

/// A persisted unit with its storage identity and timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredUnit {
	pub unit_id: Uuid,
	pub unit: KnowledgeUnit,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitListQuery {
	pub topic_id: Uuid,
	pub kind: Option<UnitKind>,
	pub status: Option<UnitStatus>,
	pub limit: u32,
	pub offset: u32,
}
impl UnitListQuery {
	pub fn new(topic_id: Uuid) -> Self {
		Self { topic_id, kind: None, status: None, limit: 50, offset: 0 }
	}

	pub fn effective_limit(&self) -> u32 {
		self.limit.clamp(1, LIST_LIMIT_MAX)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitPage {
	pub items: Vec<StoredUnit>,
	pub total: u64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct KnowledgeUnitRow {
	pub unit_id: Uuid,
	pub topic_id: Uuid,
	pub run_id: Option<Uuid>,
	pub kind: String,
	pub title: String,
	pub summary_text: String,
	pub key_points: Vec<String>,
	pub language: Option<String>,
	pub date_at: Option<OffsetDateTime>,
	pub date_unknown: bool,
	pub verification_url: String,
	pub canonical_url: Option<String>,
	pub dedup_key: String,
	pub fingerprint: String,
	pub identifiers: Json<Vec<Identifier>>,
	pub matched_terms: Vec<String>,
	pub matched_term_ids: Vec<String>,
	pub retriever_query: Option<String>,
	pub rank_score: Option<f64>,
	pub source_system: String,
	pub site_id: Option<Uuid>,
	pub retriever_name: String,
	pub retriever_version: Option<String>,
	pub retrieved_at: OffsetDateTime,
	pub attrs: Value,
	pub raw_payload_ref: Option<Uuid>,
	pub content_ref: Option<String>,
	pub status: String,
	pub duplicate_of: Option<Uuid>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl TryFrom<KnowledgeUnitRow> for StoredUnit {
	type Error = Error;

	fn try_from(row: KnowledgeUnitRow) -> Result<Self, Self::Error> {
		let kind = row.kind.parse::<UnitKind>().map_err(Error::InvalidRow)?;
		let status = row.status.parse::<UnitStatus>().map_err(Error::InvalidRow)?;
		let attrs = match row.attrs {
			Value::Object(map) => map,
			Value::Null => Map::new(),
			other => {
				return Err(Error::InvalidRow(format!(
					"attrs of unit {} must be a JSON object, got {other}.",
					row.unit_id
				)));
			},
		};

		Ok(Self {
			unit_id: row.unit_id,
			unit: KnowledgeUnit {
				topic_id: row.topic_id,
				run_id: row.run_id,
				kind,
				title: row.title,
				summary_text: row.summary_text,
				key_points: row.key_points,
				language: row.language,
				date_at: row.date_at,
				date_unknown: row.date_unknown,
				verification_url: row.verification_url,
				canonical_url: row.canonical_url,
				dedup_key: Some(row.dedup_key),
				fingerprint: Some(row.fingerprint),
				identifiers: row.identifiers.0,
				matched_terms: row.matched_terms,
				matched_term_ids: row.matched_term_ids,
				retriever_query: row.retriever_query,
				rank_score: row.rank_score,
				source_system: row.source_system,
				site_id: row.site_id,
				retriever_name: row.retriever_name,
				retriever_version: row.retriever_version,
				retrieved_at: row.retrieved_at,
				attrs,
				raw_payload_ref: row.raw_payload_ref,
				content_ref: row.content_ref,
				status,
				duplicate_of: row.duplicate_of,
			},
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct TopicRow {
	pub topic_id: Uuid,
	pub title: String,
	pub languages: Vec<String>,
	pub retrievers: Vec<String>,
	pub keyword_pool: Json<Vec<PoolTerm>>,
	pub must_pool: Json<Vec<PoolTerm>>,
	pub exclude_pool: Json<Vec<PoolTerm>>,
}
impl From<TopicRow> for Topic {
	fn from(row: TopicRow) -> Self {
		Self {
			topic_id: row.topic_id,
			title: row.title,
			languages: row.languages,
			retrievers: row.retrievers,
			keyword_pool: row.keyword_pool.0,
			must_pool: row.must_pool.0,
			exclude_pool: row.exclude_pool.0,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct SearchQueryRow {
	pub query_id: Uuid,
	pub order_index: i32,
	pub title: Option<String>,
	pub query_model: Value,
	pub target: Option<i32>,
	pub enabled_retrievers: Option<Vec<String>>,
	pub enabled: bool,
}
impl TryFrom<SearchQueryRow> for SearchQueryDef {
	type Error = Error;

	fn try_from(row: SearchQueryRow) -> Result<Self, Self::Error> {
		let query_model = serde_json::from_value::<QueryModel>(row.query_model).map_err(|err| {
			Error::InvalidRow(format!("query_model of query {} is invalid: {err}", row.query_id))
		})?;
		let target = row.target.and_then(|value| u32::try_from(value).ok()).filter(|v| *v > 0);

		Ok(Self {
			query_id: row.query_id,
			order_index: row.order_index,
			title: row.title,
			query_model,
			target,
			enabled_retrievers: row.enabled_retrievers,
			enabled: row.enabled,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn list_limit_is_clamped() {
		let mut query = UnitListQuery::new(Uuid::nil());

		query.limit = 0;

		assert_eq!(query.effective_limit(), 1);

		query.limit = 10_000;

		assert_eq!(query.effective_limit(), LIST_LIMIT_MAX);
	}
}
