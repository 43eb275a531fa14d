use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{canonical, fingerprint};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
	Publication,
	Patent,
	Webpage,
}
impl UnitKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Publication => "publication",
			Self::Patent => "patent",
			Self::Webpage => "webpage",
		}
	}
}
impl fmt::Display for UnitKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for UnitKind {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"publication" => Ok(Self::Publication),
			"patent" => Ok(Self::Patent),
			"webpage" => Ok(Self::Webpage),
			other => Err(format!("Unknown unit kind: {other}.")),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
	#[default]
	Active,
	Duplicate,
	Rejected,
	Error,
}
impl UnitStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Active => "active",
			Self::Duplicate => "duplicate",
			Self::Rejected => "rejected",
			Self::Error => "error",
		}
	}
}
impl fmt::Display for UnitStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for UnitStatus {
	type Err = String;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"active" => Ok(Self::Active),
			"duplicate" => Ok(Self::Duplicate),
			"rejected" => Ok(Self::Rejected),
			"error" => Ok(Self::Error),
			other => Err(format!("Unknown unit status: {other}.")),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
	pub scheme: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_primary: Option<bool>,
}
impl Identifier {
	pub fn new(scheme: impl Into<String>, value: impl Into<String>) -> Self {
		Self { scheme: scheme.into(), value: value.into(), is_primary: None }
	}

	pub fn primary(scheme: impl Into<String>, value: impl Into<String>) -> Self {
		Self { scheme: scheme.into(), value: value.into(), is_primary: Some(true) }
	}

	pub fn scheme_is(&self, scheme: &str) -> bool {
		self.scheme.trim().eq_ignore_ascii_case(scheme)
	}
}

/// A normalized knowledge record collected for a topic.
///
/// `dedup_key` and `fingerprint` may be absent on raw retriever output; [`Self::canonicalize`]
/// fills them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeUnit {
	pub topic_id: Uuid,
	#[serde(default)]
	pub run_id: Option<Uuid>,
	pub kind: UnitKind,
	pub title: String,
	#[serde(default)]
	pub summary_text: String,
	#[serde(default)]
	pub key_points: Vec<String>,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub date_at: Option<OffsetDateTime>,
	/// Set when a time-sliced run kept the unit without a date.
	#[serde(default, skip_serializing_if = "std::ops::Not::not")]
	pub date_unknown: bool,
	pub verification_url: String,
	#[serde(default)]
	pub canonical_url: Option<String>,
	#[serde(default)]
	pub dedup_key: Option<String>,
	#[serde(default)]
	pub fingerprint: Option<String>,
	#[serde(default)]
	pub identifiers: Vec<Identifier>,
	#[serde(default)]
	pub matched_terms: Vec<String>,
	#[serde(default)]
	pub matched_term_ids: Vec<String>,
	#[serde(default)]
	pub retriever_query: Option<String>,
	#[serde(default)]
	pub rank_score: Option<f64>,
	pub source_system: String,
	#[serde(default)]
	pub site_id: Option<Uuid>,
	pub retriever_name: String,
	#[serde(default)]
	pub retriever_version: Option<String>,
	#[serde(with = "time::serde::rfc3339")]
	pub retrieved_at: OffsetDateTime,
	#[serde(default)]
	pub attrs: Map<String, Value>,
	#[serde(default)]
	pub raw_payload_ref: Option<Uuid>,
	#[serde(default)]
	pub content_ref: Option<String>,
	#[serde(default)]
	pub status: UnitStatus,
	#[serde(default)]
	pub duplicate_of: Option<Uuid>,
}
impl KnowledgeUnit {
	pub fn new(
		topic_id: Uuid,
		kind: UnitKind,
		title: impl Into<String>,
		verification_url: impl Into<String>,
		retriever_name: impl Into<String>,
	) -> Self {
		let retriever_name = retriever_name.into();

		Self {
			topic_id,
			run_id: None,
			kind,
			title: title.into(),
			summary_text: String::new(),
			key_points: Vec::new(),
			language: None,
			date_at: None,
			date_unknown: false,
			verification_url: verification_url.into(),
			canonical_url: None,
			dedup_key: None,
			fingerprint: None,
			identifiers: Vec::new(),
			matched_terms: Vec::new(),
			matched_term_ids: Vec::new(),
			retriever_query: None,
			rank_score: None,
			source_system: retriever_name.clone(),
			site_id: None,
			retriever_name,
			retriever_version: None,
			retrieved_at: OffsetDateTime::now_utc(),
			attrs: Map::new(),
			raw_payload_ref: None,
			content_ref: None,
			status: UnitStatus::Active,
			duplicate_of: None,
		}
	}

	/// Normalizes the canonical URL and fills any missing fingerprint and dedup key.
	pub fn canonicalize(&mut self) {
		self.canonical_url = self
			.canonical_url
			.as_deref()
			.map(canonical::normalize_url)
			.filter(|url| !url.is_empty());

		if self.fingerprint.as_deref().is_none_or(|value| value.trim().is_empty()) {
			self.fingerprint = Some(fingerprint::build_fingerprint(
				self.kind,
				&self.title,
				self.date_at,
				&self.source_system,
			));
		}
		if self.dedup_key.as_deref().is_none_or(|value| value.trim().is_empty()) {
			let fingerprint = self.fingerprint.clone().unwrap_or_default();

			self.dedup_key = Some(fingerprint::build_dedup_key(
				&self.identifiers,
				self.canonical_url.as_deref(),
				&fingerprint,
			));
		}
	}

	/// The dedup key, computing it from the current fields if it was never set.
	pub fn effective_dedup_key(&self) -> String {
		match self.dedup_key.as_deref() {
			Some(key) if !key.trim().is_empty() => key.to_string(),
			_ => {
				let mut copy = self.clone();

				copy.canonicalize();

				copy.dedup_key.unwrap_or_default()
			},
		}
	}

	/// Title and summary, lowercased, used by local term filters.
	pub fn filter_text(&self) -> String {
		format!("{} {}", self.title, self.summary_text).to_lowercase()
	}

	pub fn mark_date_unknown(&mut self) {
		self.date_unknown = self.date_at.is_none();
	}

	pub fn is_date_unknown(&self) -> bool {
		self.date_unknown && self.date_at.is_none()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn canonicalize_prefers_doi_over_url() {
		let mut unit = KnowledgeUnit::new(
			Uuid::nil(),
			UnitKind::Publication,
			"Attention",
			"https://doi.org/10.1/abc",
			"openalex",
		);

		unit.canonical_url = Some("HTTPS://Doi.org/10.1/abc#top".to_string());
		unit.identifiers.push(Identifier::primary("DOI", "10.1/abc"));
		unit.canonicalize();

		assert_eq!(unit.canonical_url.as_deref(), Some("https://doi.org/10.1/abc"));
		assert_eq!(unit.dedup_key.as_deref(), Some("doi:10.1/abc"));
		assert!(unit.fingerprint.is_some());
	}

	#[test]
	fn existing_dedup_key_is_kept() {
		let mut unit =
			KnowledgeUnit::new(Uuid::nil(), UnitKind::Webpage, "Page", "https://a.test", "web");

		unit.dedup_key = Some("url:custom".to_string());
		unit.canonicalize();

		assert_eq!(unit.dedup_key.as_deref(), Some("url:custom"));
	}

	#[test]
	fn kind_parses_case_insensitively() {
		assert_eq!("Patent".parse::<UnitKind>(), Ok(UnitKind::Patent));
		assert!("book".parse::<UnitKind>().is_err());
	}
}
