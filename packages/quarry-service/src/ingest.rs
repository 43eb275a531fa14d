use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quarry_domain::{attrs::UnitAttrs, unit::KnowledgeUnit};
use quarry_storage::{KnowledgeStore, models::UpsertAction};

use crate::QuarryService;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
	pub inserted: usize,
	pub merged: usize,
	/// Stored ids in input order, for units that persisted.
	pub unit_ids: Vec<Uuid>,
	/// `(dedup_key, message)` for every unit that failed to persist.
	pub failed: Vec<(String, String)>,
	/// Dedup keys of units persisted with a kind payload that does not match its schema.
	#[serde(default)]
	pub invalid_attrs: Vec<String>,
}

/// Upserts each unit on its own. A failing unit is reported and the rest still persist.
pub async fn ingest_units(store: &dyn KnowledgeStore, units: &[KnowledgeUnit]) -> IngestReport {
	let mut report = IngestReport::default();

	for unit in units {
		let mut unit = unit.clone();

		unit.canonicalize();

		let dedup_key = unit.dedup_key.clone().unwrap_or_default();

		if let Err(err) = UnitAttrs::from_bag(unit.kind, &unit.attrs) {
			tracing::warn!(
				topic_id = %unit.topic_id,
				dedup_key = %dedup_key,
				kind = unit.kind.as_str(),
				error = %err,
				"Kind attributes do not match their schema; storing the bag as-is."
			);

			report.invalid_attrs.push(dedup_key.clone());
		}

		match store.upsert_unit(&unit).await {
			Ok(outcome) => {
				match outcome.action {
					UpsertAction::Inserted => report.inserted += 1,
					UpsertAction::Merged => report.merged += 1,
				}

				report.unit_ids.push(outcome.unit_id);
			},
			Err(err) => {
				tracing::warn!(
					topic_id = %unit.topic_id,
					dedup_key = %dedup_key,
					error = %err,
					"Failed to persist knowledge unit."
				);

				report.failed.push((dedup_key, err.to_string()));
			},
		}
	}

	tracing::info!(
		inserted = report.inserted,
		merged = report.merged,
		failed = report.failed.len(),
		invalid_attrs = report.invalid_attrs.len(),
		"Ingested knowledge units."
	);

	report
}

impl QuarryService {
	pub async fn ingest(&self, units: &[KnowledgeUnit]) -> IngestReport {
		ingest_units(self.store.as_ref(), units).await
	}
}
