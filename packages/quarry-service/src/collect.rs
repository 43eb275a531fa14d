use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quarry_domain::{
	plan::{PlanMode, SearchPlan, TimeSlice},
	terms::TermDictionary,
};

use crate::{
	CollectResult, Error, ExecutionContext, QuarryService, Result, SearchQuery, executor, planner,
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CollectRequest {
	pub topic_id: Uuid,
	#[serde(default)]
	pub run_id: Option<Uuid>,
	/// Falls back to `search.default_target`.
	#[serde(default)]
	pub target: Option<u32>,
	#[serde(default)]
	pub time_slice: Option<TimeSlice>,
	#[serde(default)]
	pub mode: PlanMode,
}

impl QuarryService {
	/// Plans the topic's enabled search definitions without running them.
	pub async fn plan(&self, topic_id: Uuid, mode: PlanMode) -> Result<SearchPlan> {
		let topic = self
			.catalog
			.load_topic(topic_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("topic {topic_id}") })?;
		let definitions = self.catalog.search_queries(topic_id).await?;

		Ok(planner::build_topic_plan(&self.cfg.search, &topic, &definitions, mode))
	}

	/// Plans and executes a collection run for one topic. Nothing is persisted.
	pub async fn collect(&self, req: &CollectRequest) -> Result<CollectResult> {
		validate_slice(req.time_slice.as_ref())?;

		let topic = self
			.catalog
			.load_topic(req.topic_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("topic {}", req.topic_id) })?;
		let definitions = self.catalog.search_queries(req.topic_id).await?;
		let plan = planner::build_topic_plan(&self.cfg.search, &topic, &definitions, req.mode);
		let dictionary = topic.dictionary();
		let ctx = ExecutionContext {
			topic_id: req.topic_id,
			run_id: req.run_id,
			target: self.target(req.target),
			time_slice: req.time_slice,
			dictionary: &dictionary,
		};
		let result = executor::execute(plan, &self.registry, &ctx).await;

		tracing::info!(
			topic_id = %req.topic_id,
			total_found = result.total_found,
			total_returned = result.total_returned,
			"Collection run finished."
		);

		Ok(result)
	}

	/// Runs a flat query for a topic through the compatibility planner.
	pub async fn collect_legacy(
		&self,
		req: &CollectRequest,
		query: &SearchQuery,
	) -> Result<CollectResult> {
		validate_slice(req.time_slice.as_ref())?;

		let plan = planner::build_legacy_plan(&self.cfg.search, query, req.mode)?;
		let dictionary = TermDictionary::new();
		let ctx = ExecutionContext {
			topic_id: req.topic_id,
			run_id: req.run_id,
			target: self.target(req.target.or(query.target)),
			time_slice: req.time_slice,
			dictionary: &dictionary,
		};

		Ok(executor::execute(plan, &self.registry, &ctx).await)
	}

	fn target(&self, requested: Option<u32>) -> usize {
		requested.filter(|target| *target > 0).unwrap_or(self.cfg.search.default_target) as usize
	}
}

fn validate_slice(slice: Option<&TimeSlice>) -> Result<()> {
	if let Some(slice) = slice
		&& slice.from > slice.to
	{
		return Err(Error::InvalidRequest {
			message: "time_slice.from must not be after time_slice.to.".to_string(),
		});
	}

	Ok(())
}
