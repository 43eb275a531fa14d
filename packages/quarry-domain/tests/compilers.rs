use std::collections::BTreeMap;

use quarry_domain::{
	compile::{self, BROAD_MATCH_PLACEHOLDER, QuerySyntax},
	query::{BoolOp, ExcludeBlock, KeywordGroup, KeywordsBlock, MustBlock, MustMode, QueryModel},
	terms::{TermDictionary, TermEntry},
};

fn dictionary() -> TermDictionary {
	let mut dictionary = TermDictionary::new();

	for (id, text, de) in [
		("t_ml", "machine learning", Some("maschinelles Lernen")),
		("t_dl", "deep learning", None),
		("t_gpu", "gpu", None),
		("t_survey", "survey", None),
		("t_blank", "", None),
	] {
		let translations = de
			.map(|value| BTreeMap::from([("de".to_string(), value.to_string())]))
			.unwrap_or_default();

		dictionary.insert(id, TermEntry { text: text.to_string(), translations });
	}

	dictionary
}

fn model(must_mode: MustMode) -> QueryModel {
	let groups = vec![
		KeywordGroup::new(BoolOp::Or, ["t_ml", "t_dl"]).expect("group"),
		KeywordGroup::new(BoolOp::And, ["t_gpu"]).expect("group"),
	];

	QueryModel::new(
		KeywordsBlock::new(groups, vec![BoolOp::And]).expect("keywords"),
		MustBlock::new(must_mode, ["benchmark", "energy use"]).expect("must"),
		ExcludeBlock::new(["t_survey", "review paper"]).expect("exclude"),
	)
}

#[test]
fn boolean_syntax_renders_groups_must_and_not() {
	let query = compile::compile(QuerySyntax::Boolean, &model(MustMode::All), &dictionary(), None);

	assert_eq!(
		query,
		"(\"machine learning\" OR \"deep learning\") AND (gpu) benchmark AND \"energy use\" \
		 NOT (survey OR \"review paper\")"
	);
}

#[test]
fn boolean_syntax_brackets_any_must_block() {
	let query = compile::compile(QuerySyntax::Boolean, &model(MustMode::Any), &dictionary(), None);

	assert!(query.contains("(benchmark OR \"energy use\")"), "{query}");
}

#[test]
fn token_prefix_syntax_uses_plus_and_minus_tokens() {
	let query =
		compile::compile(QuerySyntax::TokenPrefix, &model(MustMode::All), &dictionary(), None);

	assert_eq!(
		query,
		"(\"machine learning\" | \"deep learning\") & (gpu) +benchmark +\"energy use\" -survey \
		 -\"review paper\""
	);
}

#[test]
fn token_prefix_syntax_groups_any_must_block() {
	let query =
		compile::compile(QuerySyntax::TokenPrefix, &model(MustMode::Any), &dictionary(), None);

	assert!(query.contains("(benchmark | \"energy use\")"), "{query}");
}

#[test]
fn language_selects_translation() {
	let query =
		compile::compile(QuerySyntax::Boolean, &model(MustMode::All), &dictionary(), Some("de"));

	assert!(query.starts_with("(\"maschinelles Lernen\" OR \"deep learning\")"), "{query}");
}

#[test]
fn unresolved_term_falls_back_to_its_id() {
	let model = QueryModel::new(
		KeywordsBlock::single(KeywordGroup::new(BoolOp::Or, ["t_blank"]).expect("group")),
		MustBlock::default(),
		ExcludeBlock::default(),
	);

	assert_eq!(
		compile::compile(QuerySyntax::Boolean, &model, &dictionary(), None),
		"(t_blank)"
	);
}

#[test]
fn single_term_groups_and_excludes_stay_bracketed() {
	let model = QueryModel::new(
		KeywordsBlock::single(KeywordGroup::new(BoolOp::Or, ["t_gpu"]).expect("group")),
		MustBlock::new(MustMode::Any, ["benchmark"]).expect("must"),
		ExcludeBlock::new(["t_survey"]).expect("exclude"),
	);

	assert_eq!(
		compile::compile(QuerySyntax::Boolean, &model, &dictionary(), None),
		"(gpu) (benchmark) NOT (survey)"
	);
	assert_eq!(
		compile::compile(QuerySyntax::TokenPrefix, &model, &dictionary(), None),
		"(gpu) (benchmark) -survey"
	);
}

#[test]
fn quote_only_terms_compile_to_placeholder() {
	let model = QueryModel::new(
		KeywordsBlock::single(KeywordGroup::new(BoolOp::Or, ["\"\""]).expect("group")),
		MustBlock::default(),
		ExcludeBlock::default(),
	);

	for syntax in [QuerySyntax::Boolean, QuerySyntax::TokenPrefix] {
		assert_eq!(
			compile::compile(syntax, &model, &TermDictionary::new(), None),
			BROAD_MATCH_PLACEHOLDER
		);
	}
}

#[test]
fn preview_is_human_readable() {
	let preview = model(MustMode::All).preview(&dictionary(), None);

	assert_eq!(
		preview,
		"(\"machine learning\" OR \"deep learning\") AND (gpu) MUST(benchmark AND energy use) \
		 NOT(survey OR review paper)"
	);
}
