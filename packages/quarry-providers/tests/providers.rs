use reqwest::header::AUTHORIZATION;
use serde_json::{Map, json};
use uuid::Uuid;

use quarry_domain::{attrs::UnitAttrs, unit::UnitKind};
use quarry_providers::openalex::{self, WorkContext};

#[test]
fn builds_bearer_auth_header() {
	let headers =
		quarry_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");
	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut extra = Map::new();

	extra.insert("X-Retries".to_string(), json!(3));

	assert!(quarry_providers::auth_headers("secret", &extra).is_err());
}

#[test]
fn openalex_work_maps_to_publication() {
	let response = json!({
		"results": [
			{
				"id": "https://openalex.org/W42",
				"doi": "https://doi.org/10.1000/ABC",
				"display_name": "Direct lithium extraction",
				"publication_date": "2023-07-14",
				"language": "en",
				"type": "article",
				"cited_by_count": 17,
				"abstract_inverted_index": { "lithium": [1], "Direct": [0], "extraction": [2] },
				"primary_location": { "source": { "display_name": "Hydrometallurgy", "issn": null } },
				"authorships": [
					{ "author": { "display_name": "A. Chemist" }, "author_position": "first" }
				],
				"concepts": [{ "display_name": "Lithium", "level": 2, "score": 0.9 }]
			},
			{ "id": "https://openalex.org/W43", "display_name": "No abstract here" }
		]
	});
	let ctx = WorkContext {
		topic_id: Uuid::nil(),
		run_id: None,
		compiled_query: "lithium AND extraction",
		language: None,
		require_abstract: true,
	};
	let units = openalex::parse_works(&response, &ctx).expect("Failed to parse works.");

	assert_eq!(units.len(), 1);

	let unit = &units[0];

	assert_eq!(unit.kind, UnitKind::Publication);
	assert_eq!(unit.summary_text, "Direct lithium extraction");
	assert_eq!(unit.verification_url, "https://doi.org/10.1000/ABC");
	assert_eq!(unit.language.as_deref(), Some("en"));
	assert_eq!(unit.rank_score, Some(17.0));
	assert_eq!(unit.retriever_query.as_deref(), Some("lithium AND extraction"));
	assert_eq!(unit.identifiers[0].value, "10.1000/ABC");
	assert_eq!(unit.identifiers[0].is_primary, Some(true));
	assert_eq!(unit.identifiers[1].scheme, "openalex");

	let Some(UnitAttrs::Publication(attrs)) =
		UnitAttrs::from_bag(UnitKind::Publication, &unit.attrs).expect("Invalid attrs.")
	else {
		panic!("Expected publication attrs.");
	};

	assert_eq!(attrs.work_type.as_deref(), Some("article"));
	assert_eq!(attrs.venue.and_then(|venue| venue.display_name).as_deref(), Some("Hydrometallurgy"));
	assert_eq!(attrs.contributors.len(), 1);
	assert_eq!(attrs.metrics.and_then(|metrics| metrics.cited_by_count), Some(17));
	assert_eq!(attrs.classification.map(|class| class.topics.len()), Some(1));
	assert_eq!(attrs.source_extras["openalex"]["id"], "https://openalex.org/W42");
}
