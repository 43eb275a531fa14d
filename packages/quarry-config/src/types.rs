use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	#[serde(default)]
	pub retrievers: Retrievers,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Search {
	/// Retrievers used when a query definition carries no allow-list of its own.
	pub default_retrievers: Vec<String>,
	/// Global result target applied when a collection request does not name one.
	pub default_target: u32,
	/// Per-step cap for retrievers missing from `max_results_per_retriever`.
	pub default_max_results: u32,
	#[serde(default)]
	pub max_results_per_retriever: HashMap<String, u32>,
	#[serde(default = "default_language")]
	pub default_language: String,
}
impl Search {
	pub fn max_results_for(&self, retriever: &str) -> u32 {
		self.max_results_per_retriever.get(retriever).copied().unwrap_or(self.default_max_results)
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Retrievers {
	pub openalex: Option<OpenAlexConfig>,
	pub web: Option<WebSearchConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OpenAlexConfig {
	#[serde(default = "default_openalex_api_base")]
	pub api_base: String,
	pub api_key: Option<String>,
	pub timeout_ms: u64,
	#[serde(default = "default_true")]
	pub require_abstract: bool,
	#[serde(default = "default_openalex_max_per_page")]
	pub max_per_page: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WebSearchConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_language() -> String {
	"en".to_string()
}

fn default_openalex_api_base() -> String {
	"https://api.openalex.org".to_string()
}

fn default_openalex_max_per_page() -> u32 {
	200
}

fn default_true() -> bool {
	true
}
