//! Sequential plan execution with a global quota, per-step failure isolation, local filters,
//! and run-scoped deduplication.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quarry_domain::{
	compile,
	filter::{self, TermFilter},
	plan::{PlanStep, QueryStep, SKIP_TARGET_REACHED, SearchPlan, StepResult, TimeSlice},
	terms::TermDictionary,
	unit::KnowledgeUnit,
};

use crate::{RetrieverContext, RetrieverRegistry};

#[derive(Clone, Copy, Debug)]
pub struct ExecutionContext<'a> {
	pub topic_id: Uuid,
	pub run_id: Option<Uuid>,
	/// Global result target across all steps.
	pub target: usize,
	pub time_slice: Option<TimeSlice>,
	pub dictionary: &'a TermDictionary,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectResult {
	pub items: Vec<KnowledgeUnit>,
	/// The executed plan, with compiled queries filled for every step that reached its retriever.
	pub plan: SearchPlan,
	pub step_results: Vec<StepResult>,
	pub total_found: usize,
	pub total_returned: usize,
}

/// `(topic, dedup key)` pairs already accepted in this run.
#[derive(Debug, Default)]
struct SeenSet {
	keys: HashSet<(Uuid, String)>,
}
impl SeenSet {
	fn insert(&mut self, unit: &KnowledgeUnit) -> bool {
		self.keys.insert((unit.topic_id, unit.effective_dedup_key()))
	}
}

/// Runs `plan` step by step.
///
/// Never fails as a whole: unknown retrievers and retriever errors mark the step FAILED, unknown
/// step kinds and steps after the target is met are SKIPPED.
pub async fn execute(
	mut plan: SearchPlan,
	registry: &RetrieverRegistry,
	ctx: &ExecutionContext<'_>,
) -> CollectResult {
	let retriever_ctx = RetrieverContext {
		topic_id: ctx.topic_id,
		run_id: ctx.run_id,
		dictionary: ctx.dictionary,
		time_slice: ctx.time_slice,
	};
	let mut seen = SeenSet::default();
	let mut accumulated = Vec::new();
	let mut step_results = Vec::with_capacity(plan.steps.len());
	let mut target_reached = false;

	for (position, plan_step) in plan.steps.iter_mut().enumerate() {
		let PlanStep::Query(step) = plan_step else {
			step_results.push(StepResult::unsupported(position));

			continue;
		};

		if target_reached || accumulated.len() >= ctx.target {
			target_reached = true;

			step_results.push(StepResult::skipped(step, SKIP_TARGET_REACHED));

			continue;
		}

		let Some(retriever) = registry.get(&step.retriever) else {
			let message = format!("Retriever {} is not registered.", step.retriever);

			tracing::warn!(step_id = %step.step_id, retriever = %step.retriever, "{message}");
			step_results.push(StepResult::failed(step, message));

			continue;
		};

		step.compiled_query = Some(compile::compile(
			retriever.syntax(),
			&step.query_model,
			ctx.dictionary,
			step.language.as_deref(),
		));

		let step: &QueryStep = step;
		let raw = match retriever.retrieve(step, &retriever_ctx).await {
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(
					step_id = %step.step_id,
					retriever = %step.retriever,
					error = %err,
					"Retriever step failed."
				);
				step_results.push(StepResult::failed(step, err.to_string()));

				continue;
			},
		};
		let normalized = raw
			.into_iter()
			.map(|unit| normalize(unit, step, retriever.version(), ctx))
			.collect::<Vec<_>>();
		let found = normalized.len();
		let term_filter =
			TermFilter::from_model(&step.query_model, ctx.dictionary, step.language.as_deref());
		let mut kept = if term_filter.is_noop() {
			normalized
		} else {
			normalized.into_iter().filter(|unit| term_filter.matches(unit)).collect()
		};

		if let Some(slice) = &ctx.time_slice {
			kept = filter::apply_time_slice(kept, slice);
		}

		let survivors = kept.into_iter().filter(|unit| seen.insert(unit)).collect::<Vec<_>>();
		let returned = survivors.len();

		tracing::info!(
			step_id = %step.step_id,
			retriever = %step.retriever,
			found,
			returned,
			"Retriever step done."
		);

		accumulated.extend(survivors);
		step_results.push(StepResult::done(step, found, returned));
	}

	let mut items = dedup_all(accumulated);
	let total_found = items.len();

	items.truncate(ctx.target);

	let total_returned = items.len();

	CollectResult { items, plan, step_results, total_found, total_returned }
}

/// Pins the unit to the run's topic, fills provenance the retriever left out, and computes its
/// canonical identity.
fn normalize(
	mut unit: KnowledgeUnit,
	step: &QueryStep,
	version: Option<&str>,
	ctx: &ExecutionContext<'_>,
) -> KnowledgeUnit {
	unit.topic_id = ctx.topic_id;

	if unit.run_id.is_none() {
		unit.run_id = ctx.run_id;
	}
	if unit.retriever_name.trim().is_empty() {
		unit.retriever_name = step.retriever.clone();
	}
	if unit.retriever_version.is_none() {
		unit.retriever_version = version.map(str::to_string);
	}
	if unit.retriever_query.is_none() {
		unit.retriever_query = Some(step.compiled().to_string());
	}
	if unit.language.is_none() {
		unit.language = step.language.clone();
	}
	if unit.matched_term_ids.is_empty() {
		fill_matched_terms(&mut unit, step, ctx.dictionary);
	}

	unit.canonicalize();

	unit
}

fn fill_matched_terms(unit: &mut KnowledgeUnit, step: &QueryStep, dictionary: &TermDictionary) {
	let text = unit.filter_text();

	for term_id in step.query_model.term_ids() {
		let resolved = dictionary.resolve(term_id, step.language.as_deref()).text;

		if !resolved.trim().is_empty() && text.contains(&resolved.to_lowercase()) {
			unit.matched_term_ids.push(term_id.to_string());
			unit.matched_terms.push(resolved);
		}
	}
}

fn dedup_all(units: Vec<KnowledgeUnit>) -> Vec<KnowledgeUnit> {
	let mut seen = SeenSet::default();

	units.into_iter().filter(|unit| seen.insert(unit)).collect()
}

#[cfg(test)]
mod tests {
	use quarry_domain::unit::UnitKind;

	use super::*;

	fn unit(url: &str) -> KnowledgeUnit {
		let mut unit = KnowledgeUnit::new(Uuid::nil(), UnitKind::Webpage, url, url, "web");

		unit.canonical_url = Some(url.to_string());
		unit.canonicalize();

		unit
	}

	#[test]
	fn dedup_all_keeps_first_occurrence() {
		let units = vec![unit("https://a.test/1"), unit("https://a.test/2"), unit("https://A.test/1")];
		let deduped = dedup_all(units);

		assert_eq!(deduped.len(), 2);
		assert_eq!(deduped[0].title, "https://a.test/1");
		assert_eq!(deduped[1].title, "https://a.test/2");
	}
}
