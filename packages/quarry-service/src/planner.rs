//! Expands a topic's search definitions into an ordered [`SearchPlan`].
//!
//! One step per (definition × retriever × language). Planning is pure; compiled queries are
//! filled in by the executor once the retriever's syntax is known.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use quarry_config::Search;
use quarry_domain::{
	QueryError,
	plan::{PlanMode, PlanStep, QueryStep, SearchPlan, SearchQueryDef},
	query::{QueryModel, normalize_terms},
	topic::Topic,
};

const ANY_LANGUAGE: &str = "any";

/// Flat, unstructured query accepted by the compatibility path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
	/// Free text searched as a single term when no keywords are given.
	#[serde(default)]
	pub text: Option<String>,
	#[serde(default)]
	pub keywords: Vec<String>,
	#[serde(default)]
	pub must_have: Vec<String>,
	#[serde(default)]
	pub exclude: Vec<String>,
	#[serde(default)]
	pub language: Option<String>,
	#[serde(default)]
	pub target: Option<u32>,
	#[serde(default)]
	pub enabled_retrievers: Option<Vec<String>>,
}
impl SearchQuery {
	pub fn to_query_model(&self) -> Result<QueryModel, QueryError> {
		let text = self.text.as_deref().map(str::trim).filter(|text| !text.is_empty());
		let keywords = match text {
			Some(text) if normalize_terms(self.keywords.iter().cloned()).is_empty() =>
				vec![text.to_string()],
			_ => self.keywords.clone(),
		};

		QueryModel::from_flat(&keywords, &self.must_have, &self.exclude)
	}
}

/// Plans every enabled definition of `topic` in ascending order index.
///
/// Retrievers come from the definition's allow-list when it has one (an empty allow-list plans
/// nothing), else the topic's retrievers, else the configured defaults.
pub fn build_topic_plan(
	cfg: &Search,
	topic: &Topic,
	definitions: &[SearchQueryDef],
	mode: PlanMode,
) -> SearchPlan {
	let mut ordered = definitions.iter().filter(|def| def.enabled).collect::<Vec<_>>();

	ordered.sort_by_key(|def| def.order_index);

	let languages = normalized(&topic.languages);
	let languages =
		if languages.is_empty() { vec![None] } else { languages.into_iter().map(Some).collect() };
	let mut used_ids = HashSet::new();
	let mut steps = Vec::new();

	for def in ordered {
		let retrievers = match def.enabled_retrievers.as_deref() {
			Some(allow_list) => normalized(allow_list),
			None if !normalized(&topic.retrievers).is_empty() => normalized(&topic.retrievers),
			None => normalized(&cfg.default_retrievers),
		};

		for retriever in &retrievers {
			for language in &languages {
				let base_id = format!(
					"q{}_{}_{}",
					def.order_index,
					retriever,
					language.as_deref().unwrap_or(ANY_LANGUAGE)
				);

				steps.push(PlanStep::Query(QueryStep {
					step_id: unique_id(&mut used_ids, base_id),
					retriever: retriever.clone(),
					source_query_id: Some(def.query_id),
					order_index: def.order_index,
					query_model: def.query_model.clone(),
					max_results: step_cap(cfg, retriever, def.target),
					language: language.clone(),
					compiled_query: None,
				}));
			}
		}
	}

	tracing::debug!(
		topic_id = %topic.topic_id,
		mode = mode.as_str(),
		steps = steps.len(),
		"Built topic search plan."
	);

	SearchPlan::new(mode, steps)
}

/// Plans a flat query against its retriever override or the configured defaults.
///
/// An empty override counts as no override. Step ids are numbered from zero.
pub fn build_legacy_plan(
	cfg: &Search,
	query: &SearchQuery,
	mode: PlanMode,
) -> Result<SearchPlan, QueryError> {
	let model = query.to_query_model()?;
	let retrievers = match query.enabled_retrievers.as_deref().map(normalized) {
		Some(allow_list) if !allow_list.is_empty() => allow_list,
		_ => normalized(&cfg.default_retrievers),
	};
	let language = query.language.as_deref().map(str::trim).filter(|lang| !lang.is_empty());
	let steps = retrievers
		.iter()
		.enumerate()
		.map(|(idx, retriever)| {
			PlanStep::Query(QueryStep {
				step_id: format!("step_{idx}_{retriever}"),
				retriever: retriever.clone(),
				source_query_id: None,
				order_index: 0,
				query_model: model.clone(),
				max_results: step_cap(cfg, retriever, query.target),
				language: language.map(str::to_string),
				compiled_query: None,
			})
		})
		.collect();

	Ok(SearchPlan::new(mode, steps))
}

fn step_cap(cfg: &Search, retriever: &str, requested: Option<u32>) -> u32 {
	let cap = cfg.max_results_for(retriever);

	match requested.filter(|target| *target > 0) {
		Some(target) => cap.min(target),
		None => cap,
	}
}

fn normalized(values: &[String]) -> Vec<String> {
	let mut seen = HashSet::new();

	values
		.iter()
		.map(|value| value.trim())
		.filter(|value| !value.is_empty() && seen.insert(value.to_string()))
		.map(str::to_string)
		.collect()
}

fn unique_id(used: &mut HashSet<String>, base: String) -> String {
	if used.insert(base.clone()) {
		return base;
	}

	let mut n = 2;

	loop {
		let candidate = format!("{base}_{n}");

		if used.insert(candidate.clone()) {
			return candidate;
		}

		n += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn colliding_ids_get_a_suffix() {
		let mut used = HashSet::new();

		assert_eq!(unique_id(&mut used, "q1_web_any".to_string()), "q1_web_any");
		assert_eq!(unique_id(&mut used, "q1_web_any".to_string()), "q1_web_any_2");
		assert_eq!(unique_id(&mut used, "q1_web_any".to_string()), "q1_web_any_3");
	}

	#[test]
	fn normalized_trims_and_dedups() {
		let values = vec![" web ".to_string(), "openalex".to_string(), "web".to_string(), " ".to_string()];

		assert_eq!(normalized(&values), vec!["web".to_string(), "openalex".to_string()]);
	}
}
