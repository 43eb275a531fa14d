pub mod collect;
pub mod executor;
pub mod ingest;
pub mod planner;
pub mod retrievers;

mod error;

use std::{collections::BTreeMap, sync::Arc};

use uuid::Uuid;

pub use collect::CollectRequest;
pub use error::{Error, Result};
pub use executor::{CollectResult, ExecutionContext};
pub use ingest::IngestReport;
pub use planner::SearchQuery;
use quarry_config::Config;
use quarry_domain::{
	compile::QuerySyntax,
	plan::{QueryStep, TimeSlice},
	terms::TermDictionary,
	unit::KnowledgeUnit,
};
pub use quarry_storage::BoxFuture;
use quarry_storage::{KnowledgeStore, TopicCatalog};

/// Per-run context handed to every retriever call.
#[derive(Clone, Copy, Debug)]
pub struct RetrieverContext<'a> {
	pub topic_id: Uuid,
	pub run_id: Option<Uuid>,
	pub dictionary: &'a TermDictionary,
	pub time_slice: Option<TimeSlice>,
}

/// An external source adapter.
///
/// Implementations own their transport, timeouts, and retries. Any error marks only the calling
/// step as failed.
pub trait Retriever
where
	Self: Send + Sync,
{
	fn name(&self) -> &str;

	fn version(&self) -> Option<&str> {
		None
	}

	/// Syntax the executor compiles step queries into before calling [`Self::retrieve`].
	fn syntax(&self) -> QuerySyntax;

	fn retrieve<'a>(
		&'a self,
		step: &'a QueryStep,
		ctx: &'a RetrieverContext<'a>,
	) -> BoxFuture<'a, Result<Vec<KnowledgeUnit>>>;
}

/// Name → adapter map, built once at startup.
#[derive(Clone, Default)]
pub struct RetrieverRegistry {
	retrievers: BTreeMap<String, Arc<dyn Retriever>>,
}
impl RetrieverRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers every retriever that has a config section.
	pub fn from_config(cfg: &Config) -> Self {
		let mut registry = Self::new();

		if let Some(openalex) = &cfg.retrievers.openalex {
			registry.register(Arc::new(retrievers::OpenAlexRetriever::new(openalex.clone())));
		}
		if let Some(web) = &cfg.retrievers.web {
			registry.register(Arc::new(retrievers::WebRetriever::new(
				web.clone(),
				cfg.search.default_language.clone(),
			)));
		}

		registry
	}

	/// Adds a retriever under its own name, replacing any previous one with that name.
	pub fn register(&mut self, retriever: Arc<dyn Retriever>) {
		let name = retriever.name().trim().to_string();

		if self.retrievers.insert(name.clone(), retriever).is_some() {
			tracing::warn!(retriever = %name, "Replaced an already registered retriever.");
		}
	}

	pub fn get(&self, name: &str) -> Option<&Arc<dyn Retriever>> {
		self.retrievers.get(name.trim())
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.retrievers.keys().map(String::as_str)
	}

	pub fn is_empty(&self) -> bool {
		self.retrievers.is_empty()
	}
}

pub struct QuarryService {
	pub cfg: Config,
	pub catalog: Arc<dyn TopicCatalog>,
	pub store: Arc<dyn KnowledgeStore>,
	pub registry: RetrieverRegistry,
}
impl QuarryService {
	/// Wires the retrievers declared in config.
	pub fn new(cfg: Config, catalog: Arc<dyn TopicCatalog>, store: Arc<dyn KnowledgeStore>) -> Self {
		let registry = RetrieverRegistry::from_config(&cfg);

		Self { cfg, catalog, store, registry }
	}

	pub fn with_registry(
		cfg: Config,
		catalog: Arc<dyn TopicCatalog>,
		store: Arc<dyn KnowledgeStore>,
		registry: RetrieverRegistry,
	) -> Self {
		Self { cfg, catalog, store, registry }
	}
}
