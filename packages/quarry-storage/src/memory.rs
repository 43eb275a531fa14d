//! In-process store with the same contract as the Postgres one.
//!
//! Used by tests and dry runs. The merge policy is the domain one, so a unit ingested here ends
//! up in the same state it would in Postgres.

use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use time::OffsetDateTime;
use uuid::Uuid;

use quarry_domain::{
	merge,
	plan::SearchQueryDef,
	topic::Topic,
	unit::{KnowledgeUnit, UnitStatus},
};

use crate::{
	Error, Result,
	models::{StoredUnit, UnitListQuery, UnitPage, UpsertAction, UpsertOutcome},
	store::{BoxFuture, KnowledgeStore, TopicCatalog},
};

#[derive(Default)]
struct State {
	topics: HashMap<Uuid, Topic>,
	queries: HashMap<Uuid, Vec<SearchQueryDef>>,
	units: HashMap<(Uuid, String), StoredUnit>,
}

#[derive(Default)]
pub struct MemoryStore {
	state: Mutex<State>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert_topic(&self, topic: Topic) {
		self.lock().topics.insert(topic.topic_id, topic);
	}

	pub fn insert_search_query(&self, topic_id: Uuid, query: SearchQueryDef) {
		self.lock().queries.entry(topic_id).or_default().push(query);
	}

	pub fn unit_count(&self) -> usize {
		self.lock().units.len()
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn upsert_sync(&self, unit: &KnowledgeUnit) -> Result<UpsertOutcome> {
		let dedup_key = required(unit.dedup_key.as_deref(), "dedup_key")?;

		required(unit.fingerprint.as_deref(), "fingerprint")?;

		let now = OffsetDateTime::now_utc();
		let mut state = self.lock();
		let key = (unit.topic_id, dedup_key.to_string());

		if let Some(existing) = state.units.get_mut(&key) {
			merge::merge_into(&mut existing.unit, unit);

			existing.updated_at = now;

			return Ok(UpsertOutcome { unit_id: existing.unit_id, action: UpsertAction::Merged });
		}

		let unit_id = Uuid::new_v4();
		let mut stored = unit.clone();

		stored.dedup_key = Some(dedup_key.to_string());

		state
			.units
			.insert(key, StoredUnit { unit_id, unit: stored, created_at: now, updated_at: now });

		Ok(UpsertOutcome { unit_id, action: UpsertAction::Inserted })
	}

	fn list_sync(&self, query: &UnitListQuery) -> UnitPage {
		let state = self.lock();
		let mut matching = state
			.units
			.values()
			.filter(|stored| stored.unit.topic_id == query.topic_id)
			.filter(|stored| query.kind.is_none_or(|kind| stored.unit.kind == kind))
			.filter(|stored| query.status.is_none_or(|status| stored.unit.status == status))
			.cloned()
			.collect::<Vec<_>>();

		matching.sort_by(|a, b| {
			b.unit.retrieved_at.cmp(&a.unit.retrieved_at).then_with(|| a.unit_id.cmp(&b.unit_id))
		});

		let total = matching.len() as u64;
		let items = matching
			.into_iter()
			.skip(query.offset as usize)
			.take(query.effective_limit() as usize)
			.collect();

		UnitPage { items, total }
	}

	fn mark_duplicate_sync(&self, unit_id: Uuid, master_id: Uuid) -> Result<()> {
		if unit_id == master_id {
			return Err(Error::InvalidArgument("A unit cannot duplicate itself.".to_string()));
		}

		let mut state = self.lock();
		let Some(master_topic) = state
			.units
			.values()
			.find(|stored| stored.unit_id == master_id)
			.map(|stored| stored.unit.topic_id)
		else {
			return Err(Error::NotFound(format!("unit {unit_id} or master {master_id}")));
		};
		let Some(stored) = state.units.values_mut().find(|stored| stored.unit_id == unit_id) else {
			return Err(Error::NotFound(format!("unit {unit_id} or master {master_id}")));
		};

		if stored.unit.topic_id != master_topic {
			return Err(Error::NotFound(format!(
				"unit {unit_id} or master {master_id} in the same topic"
			)));
		}

		stored.unit.status = UnitStatus::Duplicate;
		stored.unit.duplicate_of = Some(master_id);
		stored.updated_at = OffsetDateTime::now_utc();

		Ok(())
	}
}

impl KnowledgeStore for MemoryStore {
	fn upsert_unit<'a>(&'a self, unit: &'a KnowledgeUnit) -> BoxFuture<'a, Result<UpsertOutcome>> {
		Box::pin(async move { self.upsert_sync(unit) })
	}

	fn get_unit<'a>(
		&'a self,
		topic_id: Uuid,
		dedup_key: &'a str,
	) -> BoxFuture<'a, Result<Option<StoredUnit>>> {
		Box::pin(async move {
			Ok(self.lock().units.get(&(topic_id, dedup_key.to_string())).cloned())
		})
	}

	fn list_units<'a>(&'a self, query: &'a UnitListQuery) -> BoxFuture<'a, Result<UnitPage>> {
		Box::pin(async move { Ok(self.list_sync(query)) })
	}

	fn mark_duplicate<'a>(&'a self, unit_id: Uuid, master_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.mark_duplicate_sync(unit_id, master_id) })
	}
}

impl TopicCatalog for MemoryStore {
	fn load_topic<'a>(&'a self, topic_id: Uuid) -> BoxFuture<'a, Result<Option<Topic>>> {
		Box::pin(async move { Ok(self.lock().topics.get(&topic_id).cloned()) })
	}

	fn search_queries<'a>(&'a self, topic_id: Uuid) -> BoxFuture<'a, Result<Vec<SearchQueryDef>>> {
		Box::pin(async move {
			let mut queries = self
				.lock()
				.queries
				.get(&topic_id)
				.map(|queries| {
					queries.iter().filter(|query| query.enabled).cloned().collect::<Vec<_>>()
				})
				.unwrap_or_default();

			queries.sort_by_key(|query| query.order_index);

			Ok(queries)
		})
	}
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
	value
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.ok_or_else(|| Error::InvalidArgument(format!("{field} must be set before persisting.")))
}
