use std::collections::HashMap;

use uuid::Uuid;

use quarry_config::Search;
use quarry_domain::{
	QueryError,
	plan::{PlanMode, SearchQueryDef},
	query::QueryModel,
	topic::Topic,
};
use quarry_service::{SearchQuery, planner};

fn search_cfg() -> Search {
	Search {
		default_retrievers: vec!["openalex".to_string(), "web".to_string()],
		default_target: 50,
		default_max_results: 25,
		max_results_per_retriever: HashMap::from([("web".to_string(), 10)]),
		default_language: "en".to_string(),
	}
}

fn definition(order_index: i32, target: Option<u32>, retrievers: Option<&[&str]>) -> SearchQueryDef {
	SearchQueryDef {
		query_id: Uuid::new_v4(),
		order_index,
		title: None,
		query_model: QueryModel::from_flat(&["lithium".to_string()], &[], &[]).expect("model"),
		target,
		enabled_retrievers: retrievers
			.map(|names| names.iter().map(|name| name.to_string()).collect()),
		enabled: true,
	}
}

#[test]
fn expands_definitions_across_retrievers_and_languages() {
	let mut topic = Topic::new(Uuid::new_v4(), "Battery recycling");

	topic.languages = vec!["en".to_string(), "de".to_string()];

	let mut disabled = definition(0, None, None);

	disabled.enabled = false;

	let definitions = vec![definition(2, Some(5), Some(&["web"])), definition(1, None, None), disabled];
	let plan = planner::build_topic_plan(&search_cfg(), &topic, &definitions, PlanMode::Monitoring);
	let steps = plan.query_steps().collect::<Vec<_>>();
	let ids = steps.iter().map(|step| step.step_id.as_str()).collect::<Vec<_>>();

	assert_eq!(plan.plan_version, 1);
	assert_eq!(plan.mode, PlanMode::Monitoring);
	assert_eq!(
		ids,
		vec!["q1_openalex_en", "q1_openalex_de", "q1_web_en", "q1_web_de", "q2_web_en", "q2_web_de"]
	);
	assert_eq!(steps[0].max_results, 25);
	assert_eq!(steps[2].max_results, 10);
	assert_eq!(steps[4].max_results, 5);
	assert_eq!(steps[4].source_query_id, Some(definitions[0].query_id));
	assert!(steps.iter().all(|step| step.compiled_query.is_none()));
}

#[test]
fn topic_retrievers_override_defaults_and_languages_default_to_any() {
	let mut topic = Topic::new(Uuid::new_v4(), "Battery recycling");

	topic.retrievers = vec!["web".to_string()];

	let plan = planner::build_topic_plan(
		&search_cfg(),
		&topic,
		&[definition(3, Some(100), None)],
		PlanMode::Discovery,
	);
	let steps = plan.query_steps().collect::<Vec<_>>();

	assert_eq!(steps.len(), 1);
	assert_eq!(steps[0].step_id, "q3_web_any");
	assert_eq!(steps[0].language, None);
	assert_eq!(steps[0].max_results, 10);
}

#[test]
fn empty_allow_list_plans_nothing() {
	let topic = Topic::new(Uuid::new_v4(), "Battery recycling");
	let plan = planner::build_topic_plan(
		&search_cfg(),
		&topic,
		&[definition(0, None, Some(&[]))],
		PlanMode::Discovery,
	);

	assert!(plan.steps.is_empty());
}

#[test]
fn duplicate_order_indexes_still_get_unique_ids() {
	let topic = Topic::new(Uuid::new_v4(), "Battery recycling");
	let definitions = vec![definition(1, None, Some(&["web"])), definition(1, None, Some(&["web"]))];
	let plan = planner::build_topic_plan(&search_cfg(), &topic, &definitions, PlanMode::Discovery);
	let ids = plan.query_steps().map(|step| step.step_id.clone()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["q1_web_any".to_string(), "q1_web_any_2".to_string()]);
}

#[test]
fn legacy_query_becomes_single_group_plan() {
	let query = SearchQuery {
		text: None,
		keywords: Vec::new(),
		must_have: vec!["lithium".to_string(), "recycling".to_string()],
		exclude: vec!["mining".to_string()],
		language: Some(" ru ".to_string()),
		target: Some(3),
		enabled_retrievers: None,
	};
	let plan =
		planner::build_legacy_plan(&search_cfg(), &query, PlanMode::Discovery).expect("plan");
	let steps = plan.query_steps().collect::<Vec<_>>();

	assert_eq!(
		steps.iter().map(|step| step.step_id.as_str()).collect::<Vec<_>>(),
		vec!["step_0_openalex", "step_1_web"]
	);
	assert_eq!(steps[0].language.as_deref(), Some("ru"));
	assert_eq!(steps[0].max_results, 3);
	assert_eq!(steps[0].query_model.keywords.groups()[0].terms(), ["lithium", "recycling"]);
	assert_eq!(steps[0].query_model.must.terms(), ["lithium", "recycling"]);
	assert_eq!(steps[0].query_model.exclude.terms(), ["mining"]);
}

#[test]
fn legacy_query_without_terms_is_rejected() {
	let query = SearchQuery::default();

	assert!(matches!(
		planner::build_legacy_plan(&search_cfg(), &query, PlanMode::Discovery),
		Err(QueryError::EmptyKeywords)
	));
}

#[test]
fn legacy_text_stands_in_for_missing_keywords() {
	let query = SearchQuery {
		text: Some("  solid state battery ".to_string()),
		exclude: vec!["mining".to_string()],
		..SearchQuery::default()
	};
	let plan =
		planner::build_legacy_plan(&search_cfg(), &query, PlanMode::Discovery).expect("plan");
	let step = plan.query_steps().next().expect("step");

	assert_eq!(step.query_model.keywords.groups()[0].terms(), ["solid state battery"]);
	assert!(step.query_model.must.is_empty());

	let with_keywords = SearchQuery {
		text: Some("ignored".to_string()),
		keywords: vec!["lithium".to_string()],
		..SearchQuery::default()
	};
	let model = with_keywords.to_query_model().expect("model");

	assert_eq!(model.keywords.groups()[0].terms(), ["lithium"]);
}

#[test]
fn legacy_empty_allow_list_falls_back_to_defaults() {
	let query = SearchQuery {
		keywords: vec!["lithium".to_string()],
		enabled_retrievers: Some(Vec::new()),
		..SearchQuery::default()
	};
	let plan =
		planner::build_legacy_plan(&search_cfg(), &query, PlanMode::Discovery).expect("plan");
	let ids = plan.query_steps().map(|step| step.step_id.as_str()).collect::<Vec<_>>();

	assert_eq!(ids, vec!["step_0_openalex", "step_1_web"]);
}
