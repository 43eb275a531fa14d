use serde_json::json;

use quarry_domain::{
	QueryError,
	query::{
		BoolOp, ExcludeBlock, KeywordGroup, KeywordsBlock, MAX_KEYWORD_GROUPS, MAX_TERM_LENGTH,
		MAX_TERMS_PER_GROUP, MustBlock, MustMode, QueryModel,
	},
};

fn group(terms: &[&str]) -> KeywordGroup {
	KeywordGroup::new(BoolOp::Or, terms.iter().copied()).expect("Failed to build group.")
}

#[test]
fn connector_count_must_match_groups() {
	let groups = vec![group(&["a"]), group(&["b"]), group(&["c"])];

	assert!(KeywordsBlock::new(groups.clone(), vec![BoolOp::And, BoolOp::Or]).is_ok());
	assert_eq!(
		KeywordsBlock::new(groups.clone(), vec![BoolOp::And]),
		Err(QueryError::ConnectorMismatch { expected: 2, actual: 1 })
	);
	assert_eq!(
		KeywordsBlock::new(vec![group(&["a"])], vec![BoolOp::And]),
		Err(QueryError::ConnectorMismatch { expected: 0, actual: 1 })
	);
}

#[test]
fn empty_keywords_are_rejected() {
	assert_eq!(KeywordsBlock::new(Vec::new(), Vec::new()), Err(QueryError::EmptyKeywords));
}

#[test]
fn group_terms_are_trimmed_and_deduplicated() {
	let group = group(&["  alpha ", "beta", "alpha", "", "beta "]);

	assert_eq!(group.terms(), ["alpha", "beta"]);
}

#[test]
fn blank_group_is_rejected() {
	assert_eq!(KeywordGroup::new(BoolOp::Or, ["  ", ""]), Err(QueryError::EmptyGroup));
}

#[test]
fn group_and_term_limits_are_enforced() {
	let groups = (0..=MAX_KEYWORD_GROUPS)
		.map(|idx| group(&[format!("t{idx}").as_str()]))
		.collect::<Vec<_>>();
	let connectors = vec![BoolOp::Or; groups.len() - 1];

	assert!(matches!(
		KeywordsBlock::new(groups, connectors),
		Err(QueryError::TooManyGroups { .. })
	));

	let terms = (0..=MAX_TERMS_PER_GROUP).map(|idx| format!("t{idx}")).collect::<Vec<_>>();

	assert!(matches!(
		KeywordGroup::new(BoolOp::Or, terms.clone()),
		Err(QueryError::TooManyTerms { .. })
	));
	assert!(matches!(
		MustBlock::new(MustMode::All, terms.clone()),
		Err(QueryError::TooManyTerms { .. })
	));
	assert!(matches!(ExcludeBlock::new(terms), Err(QueryError::TooManyTerms { .. })));
}

#[test]
fn long_terms_are_truncated() {
	let long = "x".repeat(MAX_TERM_LENGTH * 2);
	let group = group(&[long.as_str()]);

	assert_eq!(group.terms()[0].len(), MAX_TERM_LENGTH);
}

#[test]
fn deserialization_validates_eagerly() {
	let mismatched = json!({
		"keywords": {
			"groups": [{ "op": "AND", "terms": ["a", "b"] }, { "terms": ["c"] }],
			"connectors": [],
		},
	});

	assert!(serde_json::from_value::<QueryModel>(mismatched).is_err());

	let valid = json!({
		"keywords": {
			"groups": [{ "title": "Core", "op": "AND", "termIds": ["a", "b"] }, { "terms": "c" }],
			"connectors": ["OR"],
		},
		"must": { "mode": "ANY", "terms": ["m"] },
	});
	let model = serde_json::from_value::<QueryModel>(valid).expect("Failed to parse model.");

	assert_eq!(model.keywords.groups()[0].title(), Some("Core"));
	assert_eq!(model.keywords.groups()[0].op(), BoolOp::And);
	assert_eq!(model.keywords.groups()[1].terms(), ["c"]);
	assert_eq!(model.keywords.groups()[1].op(), BoolOp::Or);
	assert_eq!(model.must.mode(), MustMode::Any);
	assert!(model.exclude.is_empty());
}

#[test]
fn must_mode_defaults_to_all() {
	let must = serde_json::from_value::<MustBlock>(json!({ "terms": ["x"] })).expect("must");

	assert_eq!(must.mode(), MustMode::All);
}

#[test]
fn flat_query_builds_single_or_group() {
	let model = QueryModel::from_flat(
		&["graph".to_string(), "network".to_string()],
		&["neural".to_string()],
		&["survey".to_string()],
	)
	.expect("Failed to convert flat query.");

	assert_eq!(model.keywords.groups().len(), 1);
	assert_eq!(model.keywords.groups()[0].op(), BoolOp::Or);
	assert_eq!(model.keywords.groups()[0].terms(), ["graph", "network"]);
	assert_eq!(model.must.mode(), MustMode::All);
	assert_eq!(model.must.terms(), ["neural"]);
	assert_eq!(model.exclude.terms(), ["survey"]);
}

#[test]
fn flat_query_falls_back_to_must_terms() {
	let model =
		QueryModel::from_flat(&[" ".to_string()], &["neural".to_string()], &[]).expect("convert");

	assert_eq!(model.keywords.groups()[0].terms(), ["neural"]);
}

#[test]
fn flat_query_without_terms_fails() {
	assert_eq!(QueryModel::from_flat(&[], &[], &[]), Err(QueryError::EmptyKeywords));
}
