use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization;

use crate::unit::{Identifier, UnitKind};

const UNDATED_BUCKET: &str = "";

/// NFKC-normalizes, lowercases, trims, and collapses internal whitespace.
pub fn normalize_title(value: &str) -> String {
	let folded = value.nfkc().collect::<String>().to_lowercase();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `YYYY-MM` for a dated item, empty otherwise.
pub fn date_bucket(date: Option<OffsetDateTime>) -> String {
	match date {
		Some(date) => format!("{:04}-{:02}", date.year(), u8::from(date.month())),
		None => UNDATED_BUCKET.to_string(),
	}
}

/// Digest of kind, normalized title, year-month bucket, and source system.
pub fn build_fingerprint(
	kind: UnitKind,
	title: &str,
	date: Option<OffsetDateTime>,
	source_system: &str,
) -> String {
	let material = format!(
		"{}|{}|{}|{}",
		kind.as_str(),
		normalize_title(title),
		date_bucket(date),
		source_system.trim().to_lowercase()
	);

	blake3::hash(material.as_bytes()).to_hex().to_string()
}

/// Chooses the strongest identity available: `doi:`, then `patent:`, then `url:`, then `fp:`.
pub fn build_dedup_key(
	identifiers: &[Identifier],
	canonical_url: Option<&str>,
	fingerprint: &str,
) -> String {
	if let Some(doi) = identifier_value(identifiers, "doi") {
		return format!("doi:{doi}");
	}
	if let Some(patent) = identifier_value(identifiers, "patent_number") {
		return format!("patent:{patent}");
	}
	if let Some(url) = canonical_url.map(str::trim).filter(|url| !url.is_empty()) {
		return format!("url:{url}");
	}

	format!("fp:{fingerprint}")
}

fn identifier_value<'a>(identifiers: &'a [Identifier], scheme: &str) -> Option<&'a str> {
	identifiers
		.iter()
		.filter(|identifier| identifier.scheme_is(scheme))
		.map(|identifier| identifier.value.trim())
		.find(|value| !value.is_empty())
}
