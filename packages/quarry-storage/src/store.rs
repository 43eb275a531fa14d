use std::{future::Future, pin::Pin};

use uuid::Uuid;

use quarry_domain::{plan::SearchQueryDef, topic::Topic, unit::KnowledgeUnit};

use crate::{
	Result,
	db::Db,
	models::{StoredUnit, UnitListQuery, UnitPage, UpsertOutcome},
	queries,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistence contract for knowledge units.
///
/// `upsert_unit` must be atomic on `(topic_id, dedup_key)`: concurrent callers race on the
/// uniqueness constraint and exactly one of them inserts.
pub trait KnowledgeStore
where
	Self: Send + Sync,
{
	fn upsert_unit<'a>(&'a self, unit: &'a KnowledgeUnit) -> BoxFuture<'a, Result<UpsertOutcome>>;

	fn get_unit<'a>(
		&'a self,
		topic_id: Uuid,
		dedup_key: &'a str,
	) -> BoxFuture<'a, Result<Option<StoredUnit>>>;

	fn list_units<'a>(&'a self, query: &'a UnitListQuery) -> BoxFuture<'a, Result<UnitPage>>;

	fn mark_duplicate<'a>(&'a self, unit_id: Uuid, master_id: Uuid) -> BoxFuture<'a, Result<()>>;
}

/// Read access to topics and their search definitions.
pub trait TopicCatalog
where
	Self: Send + Sync,
{
	fn load_topic<'a>(&'a self, topic_id: Uuid) -> BoxFuture<'a, Result<Option<Topic>>>;

	/// Enabled definitions in ascending order index.
	fn search_queries<'a>(&'a self, topic_id: Uuid) -> BoxFuture<'a, Result<Vec<SearchQueryDef>>>;
}

impl KnowledgeStore for Db {
	fn upsert_unit<'a>(&'a self, unit: &'a KnowledgeUnit) -> BoxFuture<'a, Result<UpsertOutcome>> {
		Box::pin(queries::upsert_unit(&self.pool, unit))
	}

	fn get_unit<'a>(
		&'a self,
		topic_id: Uuid,
		dedup_key: &'a str,
	) -> BoxFuture<'a, Result<Option<StoredUnit>>> {
		Box::pin(queries::get_unit(&self.pool, topic_id, dedup_key))
	}

	fn list_units<'a>(&'a self, query: &'a UnitListQuery) -> BoxFuture<'a, Result<UnitPage>> {
		Box::pin(queries::list_units(&self.pool, query))
	}

	fn mark_duplicate<'a>(&'a self, unit_id: Uuid, master_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(queries::mark_duplicate(&self.pool, unit_id, master_id))
	}
}

impl TopicCatalog for Db {
	fn load_topic<'a>(&'a self, topic_id: Uuid) -> BoxFuture<'a, Result<Option<Topic>>> {
		Box::pin(queries::get_topic(&self.pool, topic_id))
	}

	fn search_queries<'a>(&'a self, topic_id: Uuid) -> BoxFuture<'a, Result<Vec<SearchQueryDef>>> {
		Box::pin(queries::list_search_queries(&self.pool, topic_id))
	}
}
