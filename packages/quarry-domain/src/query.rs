//! Structural query model shared by every retriever syntax.
//!
//! A model is a keyword block (ordered groups joined by connectors), a must block, and an
//! exclude block. Terms are opaque dictionary ids or, for legacy callers, literal strings.
//! Every constructor validates eagerly so a malformed model never reaches planning.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const MAX_KEYWORD_GROUPS: usize = 10;
pub const MAX_TERMS_PER_GROUP: usize = 50;
pub const MAX_TERM_LENGTH: usize = 120;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
	#[error("Keyword groups must be non-empty.")]
	EmptyKeywords,
	#[error("Keyword group terms must be non-empty.")]
	EmptyGroup,
	#[error("Too many keyword groups (max {max}, got {actual}).")]
	TooManyGroups { max: usize, actual: usize },
	#[error("Too many terms in {block} (max {max}, got {actual}).")]
	TooManyTerms { block: &'static str, max: usize, actual: usize },
	#[error(
		"Connector count must equal the number of groups minus one (expected {expected}, got {actual})."
	)]
	ConnectorMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOp {
	And,
	#[default]
	Or,
}
impl BoolOp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::And => "AND",
			Self::Or => "OR",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MustMode {
	#[default]
	All,
	Any,
}

/// Accepts either a single term or a list of terms on the wire.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum TermsInput {
	One(String),
	Many(Vec<String>),
}
impl TermsInput {
	fn into_vec(self) -> Vec<String> {
		match self {
			Self::One(term) => vec![term],
			Self::Many(terms) => terms,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
struct RawKeywordGroup {
	#[serde(default)]
	title: Option<String>,
	#[serde(default)]
	op: BoolOp,
	#[serde(default, alias = "termIds", alias = "term_ids")]
	terms: Option<TermsInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawKeywordGroup")]
pub struct KeywordGroup {
	#[serde(skip_serializing_if = "Option::is_none")]
	title: Option<String>,
	op: BoolOp,
	terms: Vec<String>,
}
impl KeywordGroup {
	pub fn new<I, S>(op: BoolOp, terms: I) -> Result<Self, QueryError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let terms = normalize_terms(terms.into_iter().map(Into::into));

		if terms.is_empty() {
			return Err(QueryError::EmptyGroup);
		}
		if terms.len() > MAX_TERMS_PER_GROUP {
			return Err(QueryError::TooManyTerms {
				block: "keyword group",
				max: MAX_TERMS_PER_GROUP,
				actual: terms.len(),
			});
		}

		Ok(Self { title: None, op, terms })
	}

	pub fn with_title(mut self, title: impl Into<String>) -> Self {
		let title = title.into();

		self.title = if title.trim().is_empty() { None } else { Some(title.trim().to_string()) };

		self
	}

	pub fn title(&self) -> Option<&str> {
		self.title.as_deref()
	}

	pub fn op(&self) -> BoolOp {
		self.op
	}

	pub fn terms(&self) -> &[String] {
		&self.terms
	}
}
impl TryFrom<RawKeywordGroup> for KeywordGroup {
	type Error = QueryError;

	fn try_from(raw: RawKeywordGroup) -> Result<Self, Self::Error> {
		let terms = raw.terms.map(TermsInput::into_vec).unwrap_or_default();
		let group = Self::new(raw.op, terms)?;

		Ok(match raw.title {
			Some(title) => group.with_title(title),
			None => group,
		})
	}
}

#[derive(Clone, Debug, Deserialize)]
struct RawKeywordsBlock {
	#[serde(default)]
	groups: Vec<KeywordGroup>,
	#[serde(default)]
	connectors: Vec<BoolOp>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawKeywordsBlock")]
pub struct KeywordsBlock {
	groups: Vec<KeywordGroup>,
	connectors: Vec<BoolOp>,
}
impl KeywordsBlock {
	pub fn new(groups: Vec<KeywordGroup>, connectors: Vec<BoolOp>) -> Result<Self, QueryError> {
		if groups.is_empty() {
			return Err(QueryError::EmptyKeywords);
		}
		if groups.len() > MAX_KEYWORD_GROUPS {
			return Err(QueryError::TooManyGroups {
				max: MAX_KEYWORD_GROUPS,
				actual: groups.len(),
			});
		}

		let expected = groups.len().saturating_sub(1);

		if connectors.len() != expected {
			return Err(QueryError::ConnectorMismatch { expected, actual: connectors.len() });
		}

		Ok(Self { groups, connectors })
	}

	/// A single group, used by callers that only know a flat term list.
	pub fn single(group: KeywordGroup) -> Self {
		Self { groups: vec![group], connectors: Vec::new() }
	}

	pub fn groups(&self) -> &[KeywordGroup] {
		&self.groups
	}

	pub fn connectors(&self) -> &[BoolOp] {
		&self.connectors
	}
}
impl TryFrom<RawKeywordsBlock> for KeywordsBlock {
	type Error = QueryError;

	fn try_from(raw: RawKeywordsBlock) -> Result<Self, Self::Error> {
		Self::new(raw.groups, raw.connectors)
	}
}

#[derive(Clone, Debug, Deserialize)]
struct RawMustBlock {
	#[serde(default)]
	mode: MustMode,
	#[serde(default, alias = "termIds", alias = "term_ids")]
	terms: Option<TermsInput>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMustBlock")]
pub struct MustBlock {
	mode: MustMode,
	terms: Vec<String>,
}
impl MustBlock {
	pub fn new<I, S>(mode: MustMode, terms: I) -> Result<Self, QueryError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let terms = normalize_terms(terms.into_iter().map(Into::into));

		if terms.len() > MAX_TERMS_PER_GROUP {
			return Err(QueryError::TooManyTerms {
				block: "must block",
				max: MAX_TERMS_PER_GROUP,
				actual: terms.len(),
			});
		}

		Ok(Self { mode, terms })
	}

	pub fn mode(&self) -> MustMode {
		self.mode
	}

	pub fn terms(&self) -> &[String] {
		&self.terms
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}
}
impl TryFrom<RawMustBlock> for MustBlock {
	type Error = QueryError;

	fn try_from(raw: RawMustBlock) -> Result<Self, Self::Error> {
		Self::new(raw.mode, raw.terms.map(TermsInput::into_vec).unwrap_or_default())
	}
}

#[derive(Clone, Debug, Deserialize)]
struct RawExcludeBlock {
	#[serde(default, alias = "termIds", alias = "term_ids")]
	terms: Option<TermsInput>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawExcludeBlock")]
pub struct ExcludeBlock {
	terms: Vec<String>,
}
impl ExcludeBlock {
	pub fn new<I, S>(terms: I) -> Result<Self, QueryError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let terms = normalize_terms(terms.into_iter().map(Into::into));

		if terms.len() > MAX_TERMS_PER_GROUP {
			return Err(QueryError::TooManyTerms {
				block: "exclude block",
				max: MAX_TERMS_PER_GROUP,
				actual: terms.len(),
			});
		}

		Ok(Self { terms })
	}

	pub fn terms(&self) -> &[String] {
		&self.terms
	}

	pub fn is_empty(&self) -> bool {
		self.terms.is_empty()
	}
}
impl TryFrom<RawExcludeBlock> for ExcludeBlock {
	type Error = QueryError;

	fn try_from(raw: RawExcludeBlock) -> Result<Self, Self::Error> {
		Self::new(raw.terms.map(TermsInput::into_vec).unwrap_or_default())
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModel {
	pub keywords: KeywordsBlock,
	#[serde(default)]
	pub must: MustBlock,
	#[serde(default)]
	pub exclude: ExcludeBlock,
}
impl QueryModel {
	pub fn new(keywords: KeywordsBlock, must: MustBlock, exclude: ExcludeBlock) -> Self {
		Self { keywords, must, exclude }
	}

	/// Builds a single OR group from a flat keyword list.
	///
	/// Must terms seed the group when no keywords are given so the model still has something to
	/// search for.
	pub fn from_flat(
		keywords: &[String],
		must_have: &[String],
		exclude: &[String],
	) -> Result<Self, QueryError> {
		let seed = if normalize_terms(keywords.iter().cloned()).is_empty() {
			must_have
		} else {
			keywords
		};
		let group = KeywordGroup::new(BoolOp::Or, seed.iter().cloned()).map_err(|err| match err {
			QueryError::EmptyGroup => QueryError::EmptyKeywords,
			other => other,
		})?;

		Ok(Self {
			keywords: KeywordsBlock::single(group),
			must: MustBlock::new(MustMode::All, must_have.iter().cloned())?,
			exclude: ExcludeBlock::new(exclude.iter().cloned())?,
		})
	}

	/// Every term id referenced anywhere in the model, in first-seen order.
	pub fn term_ids(&self) -> Vec<&str> {
		let mut seen = HashSet::new();
		let mut out = Vec::new();
		let keyword_terms = self.keywords.groups.iter().flat_map(|group| group.terms.iter());

		for term in keyword_terms.chain(self.must.terms.iter()).chain(self.exclude.terms.iter()) {
			if seen.insert(term.as_str()) {
				out.push(term.as_str());
			}
		}

		out
	}
}

/// Trims, drops blanks, truncates over-long terms, and removes duplicates preserving order.
pub fn normalize_terms<I>(terms: I) -> Vec<String>
where
	I: IntoIterator<Item = String>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for raw in terms {
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			continue;
		}

		let term = truncate_chars(trimmed, MAX_TERM_LENGTH);

		if seen.insert(term.clone()) {
			out.push(term);
		}
	}

	out
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
	match value.char_indices().nth(max_chars) {
		Some((idx, _)) => value[..idx].trim_end().to_string(),
		None => value.to_string(),
	}
}
