use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub translations: BTreeMap<String, String>,
}

/// One term of a topic keyword pool, as stored alongside the topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTerm {
	pub id: String,
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub translations: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermSource {
	/// A translation for the requested language.
	Translation,
	/// The entry's base text.
	Text,
	/// Not a dictionary id; used as a literal search string.
	Literal,
	/// A dictionary id whose entry has no usable text.
	Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTerm {
	pub text: String,
	pub source: TermSource,
}
impl ResolvedTerm {
	pub fn is_fallback(&self) -> bool {
		self.source == TermSource::Fallback
	}
}

/// Maps opaque term ids to display text with optional per-language translations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDictionary {
	entries: HashMap<String, TermEntry>,
}
impl TermDictionary {
	pub fn new() -> Self {
		Self::default()
	}

	/// Flattens keyword pools into a dictionary. Later pools win on id collisions.
	pub fn from_pools<'a, I>(pools: I) -> Self
	where
		I: IntoIterator<Item = &'a [PoolTerm]>,
	{
		let mut dictionary = Self::new();

		for pool in pools {
			for term in pool {
				let id = term.id.trim();

				if id.is_empty() {
					continue;
				}

				dictionary.insert(
					id,
					TermEntry { text: term.text.clone(), translations: term.translations.clone() },
				);
			}
		}

		dictionary
	}

	pub fn insert(&mut self, id: impl Into<String>, entry: TermEntry) {
		self.entries.insert(id.into(), entry);
	}

	pub fn get(&self, id: &str) -> Option<&TermEntry> {
		self.entries.get(id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Resolves a term for the given language.
	///
	/// Order: translation for the language, base text, then the raw term itself. Never fails.
	pub fn resolve(&self, term: &str, language: Option<&str>) -> ResolvedTerm {
		let Some(entry) = self.entries.get(term) else {
			return ResolvedTerm { text: term.to_string(), source: TermSource::Literal };
		};

		if let Some(language) = language
			&& let Some(translated) = entry.translations.get(language)
			&& !translated.trim().is_empty()
		{
			return ResolvedTerm {
				text: translated.trim().to_string(),
				source: TermSource::Translation,
			};
		}
		if !entry.text.trim().is_empty() {
			return ResolvedTerm { text: entry.text.trim().to_string(), source: TermSource::Text };
		}

		tracing::debug!(term_id = term, "Term has no text; falling back to its id.");

		ResolvedTerm { text: term.to_string(), source: TermSource::Fallback }
	}

	/// Resolves each term, dropping results that end up blank.
	pub fn resolve_all<S>(&self, terms: &[S], language: Option<&str>) -> Vec<String>
	where
		S: AsRef<str>,
	{
		terms
			.iter()
			.map(|term| self.resolve(term.as_ref(), language).text)
			.filter(|text| !text.trim().is_empty())
			.collect()
	}
}
