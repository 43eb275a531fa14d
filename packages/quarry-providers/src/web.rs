use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};
use url::Url;
use uuid::Uuid;

use quarry_config::WebSearchConfig;
use quarry_domain::{
	attrs::{UnitAttrs, WebpageAttrs},
	canonical,
	unit::{KnowledgeUnit, UnitKind},
};

use crate::{Error, Result, auth_headers, non_blank};

pub const SOURCE_SYSTEM: &str = "web";

const HIGHLIGHT_TAGS: [&str; 2] = ["<hlword>", "</hlword>"];

#[derive(Debug, Serialize)]
pub struct WebSearchRequest<'a> {
	pub query: &'a str,
	pub limit: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub language: Option<&'a str>,
}

#[derive(Clone, Copy, Debug)]
pub struct PageContext<'a> {
	pub topic_id: Uuid,
	pub run_id: Option<Uuid>,
	pub compiled_query: &'a str,
	pub language: Option<&'a str>,
}

pub async fn search(cfg: &WebSearchConfig, request: &WebSearchRequest<'_>) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base.trim_end_matches('/'), cfg.path);
	let headers = auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let res = client.post(url).headers(headers).json(request).send().await?;

	if !res.status().is_success() {
		tracing::warn!(status = %res.status(), "Web search returned an error status.");
	}

	let json: Value = res.error_for_status()?.json().await?;

	Ok(json)
}

pub fn parse_results(json: &Value, ctx: &PageContext<'_>) -> Result<Vec<KnowledgeUnit>> {
	let results = json.get("results").and_then(Value::as_array).ok_or_else(|| {
		Error::InvalidResponse { message: "Web search response is missing results array.".to_string() }
	})?;

	Ok(results.iter().filter_map(|item| map_result(item, ctx)).collect())
}

/// Maps one search hit to a webpage unit. Hits without a URL are dropped; a blank title falls
/// back to the URL.
pub fn map_result(item: &Value, ctx: &PageContext<'_>) -> Option<KnowledgeUnit> {
	let url = non_blank(item.get("url"))?;
	let title = non_blank(item.get("title"))
		.map(|title| strip_highlights(&title))
		.filter(|title| !title.is_empty())
		.unwrap_or_else(|| url.clone());
	let snippet = non_blank(item.get("snippet")).map(|snippet| strip_highlights(&snippet));
	let provider_rank = item.get("rank").and_then(Value::as_i64);
	let mut unit = KnowledgeUnit::new(ctx.topic_id, UnitKind::Webpage, title, url.clone(), SOURCE_SYSTEM);

	unit.run_id = ctx.run_id;
	unit.summary_text = snippet.clone().unwrap_or_default();
	unit.language = ctx.language.map(str::to_string);
	unit.date_at = item.get("published_at").and_then(Value::as_str).and_then(parse_date);
	unit.canonical_url = Some(canonical::normalize_url(&url)).filter(|url| !url.is_empty());
	unit.retriever_query = Some(ctx.compiled_query.to_string());
	unit.rank_score = item.get("rank").and_then(Value::as_f64);

	let attrs = UnitAttrs::Webpage(WebpageAttrs {
		domain: Url::parse(&url).ok().and_then(|parsed| parsed.host_str().map(str::to_string)),
		snippet,
		provider_rank,
		extra: Map::new(),
	});

	if let Err(err) = attrs.write_into(&mut unit.attrs) {
		tracing::debug!(error = %err, "Failed to serialize webpage attrs.");
	}

	Some(unit)
}

pub fn strip_highlights(text: &str) -> String {
	HIGHLIGHT_TAGS.iter().fold(text.to_string(), |acc, tag| acc.replace(tag, "")).trim().to_string()
}

fn parse_date(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	OffsetDateTime::parse(raw, &Rfc3339).ok().or_else(|| {
		Date::parse(raw, format_description!("[year]-[month]-[day]"))
			.ok()
			.map(|date| date.midnight().assume_utc())
	})
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	const CTX: PageContext<'static> = PageContext {
		topic_id: Uuid::nil(),
		run_id: None,
		compiled_query: "+lithium",
		language: Some("ru"),
	};

	#[test]
	fn hit_is_mapped_with_highlights_stripped() {
		let item = json!({
			"url": "https://News.Test/a?utm_source=x",
			"title": "<hlword>Lithium</hlword> prices",
			"snippet": "Spot <hlword>lithium</hlword> fell",
			"published_at": "2024-05-02",
			"rank": 3
		});
		let unit = map_result(&item, &CTX).expect("Expected a unit.");

		assert_eq!(unit.title, "Lithium prices");
		assert_eq!(unit.summary_text, "Spot lithium fell");
		assert_eq!(unit.source_system, "web");
		assert_eq!(unit.date_at, Some(time::macros::datetime!(2024-05-02 0:00 UTC)));
		assert_eq!(unit.attrs["webpage"]["domain"], "news.test");
		assert_eq!(unit.attrs["webpage"]["provider_rank"], 3);
	}

	#[test]
	fn blank_url_is_dropped_and_blank_title_falls_back() {
		assert!(map_result(&json!({ "url": " ", "title": "x" }), &CTX).is_none());

		let unit = map_result(&json!({ "url": "https://a.test/x" }), &CTX).expect("unit");

		assert_eq!(unit.title, "https://a.test/x");
		assert_eq!(unit.date_at, None);
	}

	#[test]
	fn missing_results_array_is_an_error() {
		assert!(matches!(
			parse_results(&json!({ "items": [] }), &CTX),
			Err(Error::InvalidResponse { .. })
		));
	}
}
