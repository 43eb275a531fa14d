//! OpenAlex works API: request building and work → knowledge unit mapping.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use time::{Date, Month, OffsetDateTime, macros::format_description};
use uuid::Uuid;

use quarry_config::{OPENALEX_MAX_PER_PAGE, OpenAlexConfig};
use quarry_domain::{
	attrs::{Classification, ClassificationTopic, Metrics, PublicationAttrs, UnitAttrs},
	unit::{Identifier, KnowledgeUnit, UnitKind},
};

use crate::{Error, Result, non_blank};

pub const SOURCE_SYSTEM: &str = "openalex";

const DOI_PREFIXES: [&str; 2] = ["https://doi.org/", "http://doi.org/"];

#[derive(Clone, Debug)]
pub struct WorksRequest<'a> {
	pub search: &'a str,
	pub per_page: u32,
	pub page: u32,
	pub from_date: Option<Date>,
	pub to_date: Option<Date>,
}
impl WorksRequest<'_> {
	pub fn query_params(&self, api_key: Option<&str>) -> Vec<(&'static str, String)> {
		let mut params = vec![
			("search", self.search.to_string()),
			("per-page", self.per_page.clamp(1, OPENALEX_MAX_PER_PAGE).to_string()),
			("page", self.page.max(1).to_string()),
		];

		if let Some(api_key) = api_key.map(str::trim).filter(|key| !key.is_empty()) {
			params.push(("api_key", api_key.to_string()));
		}

		let mut filters = Vec::new();

		if let Some(from) = self.from_date {
			filters.push(format!("from_publication_date:{from}"));
		}
		if let Some(to) = self.to_date {
			filters.push(format!("to_publication_date:{to}"));
		}
		if !filters.is_empty() {
			params.push(("filter", filters.join(",")));
		}

		params
	}
}

/// Context carried into every mapped work.
#[derive(Clone, Copy, Debug)]
pub struct WorkContext<'a> {
	pub topic_id: Uuid,
	pub run_id: Option<Uuid>,
	pub compiled_query: &'a str,
	pub language: Option<&'a str>,
	pub require_abstract: bool,
}

pub async fn search_works(cfg: &OpenAlexConfig, request: &WorksRequest<'_>) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}/works", cfg.api_base.trim_end_matches('/'));
	let res = client.get(url).query(&request.query_params(cfg.api_key.as_deref())).send().await?;

	if !res.status().is_success() {
		tracing::warn!(status = %res.status(), "OpenAlex returned an error status.");
	}

	let json: Value = res.error_for_status()?.json().await?;

	Ok(json)
}

pub fn parse_works(json: &Value, ctx: &WorkContext<'_>) -> Result<Vec<KnowledgeUnit>> {
	let results = json.get("results").and_then(Value::as_array).ok_or_else(|| {
		Error::InvalidResponse { message: "OpenAlex response is missing results array.".to_string() }
	})?;

	Ok(results.iter().filter_map(|work| map_work(work, ctx)).collect())
}

/// Maps one work. Returns `None` for works without a title, without any verifiable URL, or
/// without an abstract when one is required.
pub fn map_work(work: &Value, ctx: &WorkContext<'_>) -> Option<KnowledgeUnit> {
	let title = non_blank(work.get("display_name"))?;
	let abstract_text = rebuild_abstract(work.get("abstract_inverted_index"));

	if ctx.require_abstract && abstract_text.is_empty() {
		return None;
	}

	let doi = non_blank(work.get("doi"));
	let openalex_id = non_blank(work.get("id"));
	let doi_url = doi.as_deref().map(|doi| {
		if doi.starts_with("http") { doi.to_string() } else { format!("{}{doi}", DOI_PREFIXES[0]) }
	});
	let verification_url = doi_url.clone().or_else(|| openalex_id.clone())?;
	let mut unit =
		KnowledgeUnit::new(ctx.topic_id, UnitKind::Publication, title, verification_url, SOURCE_SYSTEM);

	unit.run_id = ctx.run_id;
	unit.summary_text = if abstract_text.is_empty() { unit.title.clone() } else { abstract_text };
	unit.language =
		ctx.language.map(str::to_string).or_else(|| non_blank(work.get("language")));
	unit.date_at = publication_date(work);
	unit.canonical_url = doi_url;
	unit.retriever_query = Some(ctx.compiled_query.to_string());
	unit.rank_score = work.get("cited_by_count").and_then(Value::as_f64);

	if let Some(doi) = doi.as_deref() {
		unit.identifiers.push(Identifier::primary("doi", strip_doi_prefix(doi)));
	}
	if let Some(openalex_id) = openalex_id.as_deref() {
		unit.identifiers.push(Identifier {
			scheme: "openalex".to_string(),
			value: openalex_id.to_string(),
			is_primary: Some(false),
		});
	}

	let attrs = UnitAttrs::Publication(publication_attrs(work, openalex_id.as_deref()));

	if let Err(err) = attrs.write_into(&mut unit.attrs) {
		tracing::debug!(error = %err, "Failed to serialize publication attrs.");
	}

	Some(unit)
}

/// Rebuilds an abstract from OpenAlex's `word -> [positions]` inverted index.
pub fn rebuild_abstract(inverted: Option<&Value>) -> String {
	let Some(index) = inverted.and_then(Value::as_object) else {
		return String::new();
	};
	let mut positioned = Vec::new();

	for (word, positions) in index {
		for position in positions.as_array().into_iter().flatten().filter_map(Value::as_u64) {
			positioned.push((position, word.as_str()));
		}
	}

	positioned.sort_by_key(|(position, _)| *position);

	positioned.into_iter().map(|(_, word)| word).collect::<Vec<_>>().join(" ")
}

fn publication_date(work: &Value) -> Option<OffsetDateTime> {
	let date = work
		.get("publication_date")
		.and_then(Value::as_str)
		.and_then(|raw| Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok())
		.or_else(|| {
			let year = work.get("publication_year").and_then(Value::as_i64)?;

			Date::from_calendar_date(i32::try_from(year).ok()?, Month::January, 1).ok()
		})?;

	Some(date.midnight().assume_utc())
}

fn strip_doi_prefix(doi: &str) -> &str {
	DOI_PREFIXES.iter().find_map(|prefix| doi.strip_prefix(prefix)).unwrap_or(doi)
}

fn publication_attrs(work: &Value, openalex_id: Option<&str>) -> PublicationAttrs {
	let cited_by_count = work.get("cited_by_count").and_then(Value::as_i64);
	let fwci = work.get("fwci").and_then(Value::as_f64);
	let metrics = (cited_by_count.is_some() || fwci.is_some())
		.then_some(Metrics { cited_by_count, fwci });
	let topics = work
		.get("concepts")
		.and_then(Value::as_array)
		.filter(|items| !items.is_empty())
		.or_else(|| work.get("topics").and_then(Value::as_array))
		.into_iter()
		.flatten()
		.filter_map(|item| lenient::<ClassificationTopic>(Some(item)))
		.collect::<Vec<_>>();
	let mut source_extras = Map::new();

	if let Some(openalex_id) = openalex_id {
		source_extras.insert(SOURCE_SYSTEM.to_string(), json!({ "id": openalex_id }));
	}

	PublicationAttrs {
		work_type: non_blank(work.get("type")),
		venue: lenient(work.get("primary_location").and_then(|location| location.get("source"))),
		biblio: lenient(work.get("biblio")),
		contributors: work
			.get("authorships")
			.and_then(Value::as_array)
			.into_iter()
			.flatten()
			.filter_map(|item| lenient(Some(item)))
			.collect(),
		access: lenient(work.get("open_access")),
		metrics,
		classification: (!topics.is_empty()).then_some(Classification { topics }),
		relations: None,
		source_extras,
		extra: Map::new(),
	}
}

fn lenient<T>(value: Option<&Value>) -> Option<T>
where
	T: DeserializeOwned,
{
	value.filter(|value| value.is_object()).and_then(|value| T::deserialize(value).ok())
}
