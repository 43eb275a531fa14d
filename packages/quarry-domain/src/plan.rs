use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::query::QueryModel;

pub const PLAN_VERSION: u32 = 1;

pub const SKIP_UNKNOWN_KIND: &str = "Unknown step kind.";
pub const SKIP_TARGET_REACHED: &str = "Target result count reached.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
	#[default]
	Discovery,
	Monitoring,
}
impl PlanMode {
	/// Parses a requested mode, falling back to discovery for anything unrecognized.
	pub fn parse_lenient(value: &str) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"monitoring" => Self::Monitoring,
			_ => Self::Discovery,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Discovery => "discovery",
			Self::Monitoring => "monitoring",
		}
	}
}

/// Inclusive `[from, to]` window on unit dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlice {
	#[serde(with = "time::serde::rfc3339")]
	pub from: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub to: OffsetDateTime,
}
impl TimeSlice {
	pub fn contains(&self, at: OffsetDateTime) -> bool {
		self.from <= at && at <= self.to
	}
}

/// A persisted, ordered search definition belonging to a topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryDef {
	pub query_id: Uuid,
	pub order_index: i32,
	#[serde(default)]
	pub title: Option<String>,
	pub query_model: QueryModel,
	#[serde(default)]
	pub target: Option<u32>,
	#[serde(default)]
	pub enabled_retrievers: Option<Vec<String>>,
	#[serde(default = "default_enabled")]
	pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryStep {
	pub step_id: String,
	pub retriever: String,
	#[serde(default)]
	pub source_query_id: Option<Uuid>,
	pub order_index: i32,
	pub query_model: QueryModel,
	pub max_results: u32,
	#[serde(default)]
	pub language: Option<String>,
	/// Native query string sent to the retriever. Filled when the step runs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub compiled_query: Option<String>,
}
impl QueryStep {
	pub fn compiled(&self) -> &str {
		self.compiled_query.as_deref().unwrap_or(crate::compile::BROAD_MATCH_PLACEHOLDER)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
	Query(QueryStep),
	/// A step kind this build does not know how to execute.
	#[serde(other)]
	Unsupported,
}
impl PlanStep {
	pub fn as_query(&self) -> Option<&QueryStep> {
		match self {
			Self::Query(step) => Some(step),
			Self::Unsupported => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
	pub plan_version: u32,
	pub mode: PlanMode,
	pub steps: Vec<PlanStep>,
}
impl SearchPlan {
	pub fn new(mode: PlanMode, steps: Vec<PlanStep>) -> Self {
		Self { plan_version: PLAN_VERSION, mode, steps }
	}

	pub fn empty(mode: PlanMode) -> Self {
		Self::new(mode, Vec::new())
	}

	pub fn query_steps(&self) -> impl Iterator<Item = &QueryStep> {
		self.steps.iter().filter_map(PlanStep::as_query)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
	Done,
	Failed,
	Skipped,
}
impl fmt::Display for StepStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Done => "done",
			Self::Failed => "failed",
			Self::Skipped => "skipped",
		})
	}
}

/// Audit record for one executed, failed, or skipped step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
	pub step_id: String,
	#[serde(default)]
	pub retriever: Option<String>,
	#[serde(default)]
	pub source_query_id: Option<Uuid>,
	#[serde(default)]
	pub order_index: Option<i32>,
	pub status: StepStatus,
	pub found: usize,
	pub returned: usize,
	#[serde(default)]
	pub error: Option<String>,
}
impl StepResult {
	pub fn done(step: &QueryStep, found: usize, returned: usize) -> Self {
		Self { found, returned, ..Self::for_step(step, StepStatus::Done) }
	}

	pub fn failed(step: &QueryStep, message: impl Into<String>) -> Self {
		Self { error: Some(message.into()), ..Self::for_step(step, StepStatus::Failed) }
	}

	pub fn skipped(step: &QueryStep, reason: impl Into<String>) -> Self {
		Self { error: Some(reason.into()), ..Self::for_step(step, StepStatus::Skipped) }
	}

	pub fn unsupported(position: usize) -> Self {
		Self {
			step_id: format!("step_{}_unsupported", position + 1),
			retriever: None,
			source_query_id: None,
			order_index: None,
			status: StepStatus::Skipped,
			found: 0,
			returned: 0,
			error: Some(SKIP_UNKNOWN_KIND.to_string()),
		}
	}

	fn for_step(step: &QueryStep, status: StepStatus) -> Self {
		Self {
			step_id: step.step_id.clone(),
			retriever: Some(step.retriever.clone()),
			source_query_id: step.source_query_id,
			order_index: Some(step.order_index),
			status,
			found: 0,
			returned: 0,
			error: None,
		}
	}
}

fn default_enabled() -> bool {
	true
}
