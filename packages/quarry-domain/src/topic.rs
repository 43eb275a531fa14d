use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::terms::{PoolTerm, TermDictionary};

/// A research topic: the ownership and dedup boundary for collected units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
	pub topic_id: Uuid,
	pub title: String,
	/// Languages to plan steps for. Empty means one language-agnostic step per retriever.
	#[serde(default)]
	pub languages: Vec<String>,
	/// Retrievers enabled for this topic. Empty means the configured defaults.
	#[serde(default)]
	pub retrievers: Vec<String>,
	#[serde(default)]
	pub keyword_pool: Vec<PoolTerm>,
	#[serde(default)]
	pub must_pool: Vec<PoolTerm>,
	#[serde(default)]
	pub exclude_pool: Vec<PoolTerm>,
}
impl Topic {
	pub fn new(topic_id: Uuid, title: impl Into<String>) -> Self {
		Self {
			topic_id,
			title: title.into(),
			languages: Vec::new(),
			retrievers: Vec::new(),
			keyword_pool: Vec::new(),
			must_pool: Vec::new(),
			exclude_pool: Vec::new(),
		}
	}

	pub fn dictionary(&self) -> TermDictionary {
		TermDictionary::from_pools([
			self.keyword_pool.as_slice(),
			self.must_pool.as_slice(),
			self.exclude_pool.as_slice(),
		])
	}
}
