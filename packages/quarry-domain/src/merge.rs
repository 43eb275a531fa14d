//! Field-level merge policy applied when an incoming unit collides with a stored one.
//!
//! Existing non-empty values always win. Only empty fields are filled from the incoming unit.
//! Identity and provenance fields (`title`, `verification_url`, `kind`, `source_system`,
//! `retriever_name`, `status`, keys) are never touched.

use crate::unit::KnowledgeUnit;

/// Fills empty fields of `existing` from `incoming` and returns the names of filled fields.
pub fn merge_into(existing: &mut KnowledgeUnit, incoming: &KnowledgeUnit) -> Vec<&'static str> {
	let mut filled = Vec::new();

	if existing.summary_text.trim().is_empty() && !incoming.summary_text.trim().is_empty() {
		existing.summary_text = incoming.summary_text.clone();

		filled.push("summary_text");
	}

	fill_text(&mut existing.canonical_url, &incoming.canonical_url, "canonical_url", &mut filled);
	fill_text(&mut existing.language, &incoming.language, "language", &mut filled);
	fill(&mut existing.date_at, &incoming.date_at, "date_at", &mut filled);

	existing.date_unknown =
		existing.date_at.is_none() && (existing.date_unknown || incoming.date_unknown);

	fill_text(
		&mut existing.retriever_query,
		&incoming.retriever_query,
		"retriever_query",
		&mut filled,
	);
	fill(&mut existing.rank_score, &incoming.rank_score, "rank_score", &mut filled);
	fill(&mut existing.site_id, &incoming.site_id, "site_id", &mut filled);
	fill_text(
		&mut existing.retriever_version,
		&incoming.retriever_version,
		"retriever_version",
		&mut filled,
	);
	fill(&mut existing.raw_payload_ref, &incoming.raw_payload_ref, "raw_payload_ref", &mut filled);
	fill_text(&mut existing.content_ref, &incoming.content_ref, "content_ref", &mut filled);
	fill_vec(&mut existing.key_points, &incoming.key_points, "key_points", &mut filled);
	fill_vec(&mut existing.identifiers, &incoming.identifiers, "identifiers", &mut filled);
	fill_vec(&mut existing.matched_terms, &incoming.matched_terms, "matched_terms", &mut filled);
	fill_vec(
		&mut existing.matched_term_ids,
		&incoming.matched_term_ids,
		"matched_term_ids",
		&mut filled,
	);

	if existing.attrs.is_empty() && !incoming.attrs.is_empty() {
		existing.attrs = incoming.attrs.clone();

		filled.push("attrs");
	}

	filled
}

fn fill<T>(
	slot: &mut Option<T>,
	incoming: &Option<T>,
	name: &'static str,
	filled: &mut Vec<&'static str>,
) where
	T: Clone,
{
	if slot.is_none() && incoming.is_some() {
		slot.clone_from(incoming);
		filled.push(name);
	}
}

fn fill_text(
	slot: &mut Option<String>,
	incoming: &Option<String>,
	name: &'static str,
	filled: &mut Vec<&'static str>,
) {
	let slot_empty = slot.as_deref().is_none_or(|value| value.trim().is_empty());
	let incoming_present = incoming.as_deref().is_some_and(|value| !value.trim().is_empty());

	if slot_empty && incoming_present {
		slot.clone_from(incoming);
		filled.push(name);
	}
}

fn fill_vec<T>(
	slot: &mut Vec<T>,
	incoming: &[T],
	name: &'static str,
	filled: &mut Vec<&'static str>,
) where
	T: Clone,
{
	if slot.is_empty() && !incoming.is_empty() {
		*slot = incoming.to_vec();

		filled.push(name);
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use uuid::Uuid;

	use super::*;
	use crate::unit::{Identifier, UnitKind};

	fn unit(title: &str) -> KnowledgeUnit {
		KnowledgeUnit::new(Uuid::nil(), UnitKind::Publication, title, "https://a.test/", "openalex")
	}

	#[test]
	fn fills_only_empty_fields() {
		let mut existing = unit("Stored");

		existing.language = Some("en".to_string());

		let mut incoming = unit("Incoming");

		incoming.summary_text = "Abstract.".to_string();
		incoming.language = Some("de".to_string());
		incoming.rank_score = Some(4.0);
		incoming.identifiers = vec![Identifier::new("doi", "10.1/x")];
		incoming.attrs.insert("publication".to_string(), json!({ "venue": { "name": "V" } }));

		let filled = merge_into(&mut existing, &incoming);

		assert_eq!(existing.title, "Stored");
		assert_eq!(existing.summary_text, "Abstract.");
		assert_eq!(existing.language.as_deref(), Some("en"));
		assert_eq!(existing.rank_score, Some(4.0));
		assert_eq!(existing.identifiers.len(), 1);
		assert!(existing.attrs.contains_key("publication"));
		assert_eq!(filled, vec!["summary_text", "rank_score", "identifiers", "attrs"]);
	}

	#[test]
	fn blank_text_counts_as_empty() {
		let mut existing = unit("Stored");

		existing.canonical_url = Some("  ".to_string());

		let mut incoming = unit("Incoming");

		incoming.canonical_url = Some("https://b.test/".to_string());

		merge_into(&mut existing, &incoming);

		assert_eq!(existing.canonical_url.as_deref(), Some("https://b.test/"));
	}

	#[test]
	fn later_date_clears_unknown_marker_and_attrs_still_fill() {
		let mut existing = unit("Stored");

		existing.mark_date_unknown();

		assert!(existing.is_date_unknown());
		assert!(existing.attrs.is_empty());

		let mut incoming = unit("Incoming");

		incoming.date_at = Some(time::macros::datetime!(2024-03-01 0:00 UTC));
		incoming.attrs.insert("publication".to_string(), json!({ "work_type": "article" }));

		let filled = merge_into(&mut existing, &incoming);

		assert!(!existing.is_date_unknown());
		assert!(!existing.date_unknown);
		assert_eq!(filled, vec!["date_at", "attrs"]);
	}
}
