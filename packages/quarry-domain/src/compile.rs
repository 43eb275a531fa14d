//! Renders a [`QueryModel`] into a retriever's native query string.
//!
//! Compilation is pure: no I/O, terms are resolved through the dictionary for the step
//! language, and an empty rendering becomes [`BROAD_MATCH_PLACEHOLDER`] so a retriever is never
//! handed an empty query.

use serde::{Deserialize, Serialize};

use crate::{
	query::{BoolOp, MustMode, QueryModel},
	terms::TermDictionary,
};

pub const BROAD_MATCH_PLACEHOLDER: &str = "*";

const EMPTY_PREVIEW: &str = "No query terms; add keywords to the query.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySyntax {
	/// `AND`/`OR`/`NOT` operators with parenthesised groups.
	Boolean,
	/// `+required`/`-excluded` tokens with `|`/`&` operators.
	TokenPrefix,
}

pub trait QueryCompiler {
	fn syntax(&self) -> QuerySyntax;

	fn compile(&self, model: &QueryModel, dictionary: &TermDictionary, language: Option<&str>)
	-> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BooleanCompiler;
impl QueryCompiler for BooleanCompiler {
	fn syntax(&self) -> QuerySyntax {
		QuerySyntax::Boolean
	}

	fn compile(
		&self,
		model: &QueryModel,
		dictionary: &TermDictionary,
		language: Option<&str>,
	) -> String {
		let mut parts = Vec::new();

		if let Some(keywords) = render_keywords(model, dictionary, language, boolean_group, |op| {
			format!(" {} ", op.as_str())
		}) {
			parts.push(keywords);
		}

		let must = quoted(dictionary.resolve_all(model.must.terms(), language));

		if !must.is_empty() {
			parts.push(match model.must.mode() {
				MustMode::All => must.join(" AND "),
				MustMode::Any => wrap(&must, " OR "),
			});
		}

		let exclude = quoted(dictionary.resolve_all(model.exclude.terms(), language));

		if !exclude.is_empty() {
			parts.push(format!("NOT {}", wrap(&exclude, " OR ")));
		}

		finish(parts)
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokenPrefixCompiler;
impl QueryCompiler for TokenPrefixCompiler {
	fn syntax(&self) -> QuerySyntax {
		QuerySyntax::TokenPrefix
	}

	fn compile(
		&self,
		model: &QueryModel,
		dictionary: &TermDictionary,
		language: Option<&str>,
	) -> String {
		let mut parts = Vec::new();

		if let Some(keywords) = render_keywords(model, dictionary, language, token_group, |op| {
			match op {
				BoolOp::And => " & ".to_string(),
				BoolOp::Or => " | ".to_string(),
			}
		}) {
			parts.push(keywords);
		}

		let must = quoted(dictionary.resolve_all(model.must.terms(), language));

		if !must.is_empty() {
			parts.push(match model.must.mode() {
				MustMode::All =>
					must.iter().map(|term| format!("+{term}")).collect::<Vec<_>>().join(" "),
				MustMode::Any => wrap(&must, " | "),
			});
		}

		let exclude = quoted(dictionary.resolve_all(model.exclude.terms(), language));

		if !exclude.is_empty() {
			parts.push(exclude.iter().map(|term| format!("-{term}")).collect::<Vec<_>>().join(" "));
		}

		finish(parts)
	}
}

pub fn compiler_for(syntax: QuerySyntax) -> &'static dyn QueryCompiler {
	match syntax {
		QuerySyntax::Boolean => &BooleanCompiler,
		QuerySyntax::TokenPrefix => &TokenPrefixCompiler,
	}
}

pub fn compile(
	syntax: QuerySyntax,
	model: &QueryModel,
	dictionary: &TermDictionary,
	language: Option<&str>,
) -> String {
	compiler_for(syntax).compile(model, dictionary, language)
}

impl QueryModel {
	/// Human-readable rendering, e.g. `(a OR b) AND (c) MUST(x AND y) NOT(z)`.
	pub fn preview(&self, dictionary: &TermDictionary, language: Option<&str>) -> String {
		preview(self, dictionary, language)
	}
}

pub fn preview(model: &QueryModel, dictionary: &TermDictionary, language: Option<&str>) -> String {
	let mut parts = Vec::new();

	if let Some(keywords) = render_keywords(
		model,
		dictionary,
		language,
		|op, terms| format!("({})", terms.join(&format!(" {} ", op.as_str()))),
		|op| format!(" {} ", op.as_str()),
	) {
		parts.push(keywords);
	}

	let must = dictionary.resolve_all(model.must.terms(), language);

	if !must.is_empty() {
		let joiner = match model.must.mode() {
			MustMode::All => " AND ",
			MustMode::Any => " OR ",
		};

		parts.push(format!("MUST({})", must.join(joiner)));
	}

	let exclude = dictionary.resolve_all(model.exclude.terms(), language);

	if !exclude.is_empty() {
		parts.push(format!("NOT({})", exclude.join(" OR ")));
	}

	if parts.is_empty() { EMPTY_PREVIEW.to_string() } else { parts.join(" ") }
}

/// Wraps a term in double quotes when it contains whitespace.
pub fn quote_term(term: &str) -> String {
	let cleaned = term.replace('"', "");
	let cleaned = cleaned.trim();

	if cleaned.chars().any(char::is_whitespace) {
		format!("\"{cleaned}\"")
	} else {
		cleaned.to_string()
	}
}

fn render_keywords<G, C>(
	model: &QueryModel,
	dictionary: &TermDictionary,
	language: Option<&str>,
	render_group: G,
	render_connector: C,
) -> Option<String>
where
	G: Fn(BoolOp, &[String]) -> String,
	C: Fn(BoolOp) -> String,
{
	let groups = model.keywords.groups();
	let connectors = model.keywords.connectors();
	let mut out = String::new();

	for (idx, group) in groups.iter().enumerate() {
		let terms = quoted(dictionary.resolve_all(group.terms(), language));

		if terms.is_empty() {
			continue;
		}
		if !out.is_empty() {
			let op = idx.checked_sub(1).and_then(|prev| connectors.get(prev)).copied();

			out.push_str(&render_connector(op.unwrap_or_default()));
		}

		out.push_str(&render_group(group.op(), &terms));
	}

	if out.is_empty() { None } else { Some(out) }
}

fn boolean_group(op: BoolOp, terms: &[String]) -> String {
	wrap(terms, &format!(" {} ", op.as_str()))
}

fn token_group(op: BoolOp, terms: &[String]) -> String {
	match op {
		BoolOp::And => wrap(terms, " & "),
		BoolOp::Or => wrap(terms, " | "),
	}
}

fn wrap(terms: &[String], joiner: &str) -> String {
	format!("({})", terms.join(joiner))
}

fn quoted(terms: Vec<String>) -> Vec<String> {
	terms.iter().map(|term| quote_term(term)).filter(|term| !term.is_empty()).collect()
}

fn finish(parts: Vec<String>) -> String {
	if parts.is_empty() { BROAD_MATCH_PLACEHOLDER.to_string() } else { parts.join(" ") }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quotes_only_multi_word_terms() {
		assert_eq!(quote_term("graph"), "graph");
		assert_eq!(quote_term("graph  neural"), "\"graph  neural\"");
		assert_eq!(quote_term("say \"hi\" there"), "\"say hi there\"");
	}

	#[test]
	fn groups_are_always_bracketed() {
		assert_eq!(wrap(&["a".to_string()], " OR "), "(a)");
		assert_eq!(wrap(&["a".to_string(), "b".to_string()], " OR "), "(a OR b)");
	}
}
