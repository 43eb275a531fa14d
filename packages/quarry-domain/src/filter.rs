//! Step-local filters applied to normalized retriever output.

use crate::{
	plan::TimeSlice,
	query::{MustMode, QueryModel},
	terms::TermDictionary,
	unit::KnowledgeUnit,
};

/// MUST/EXCLUDE term filter over title and summary, case-insensitive substring match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermFilter {
	must_mode: MustMode,
	must: Vec<String>,
	exclude: Vec<String>,
}
impl TermFilter {
	pub fn from_model(
		model: &QueryModel,
		dictionary: &TermDictionary,
		language: Option<&str>,
	) -> Self {
		let lower = |terms: Vec<String>| -> Vec<String> {
			terms.into_iter().map(|term| term.to_lowercase()).collect()
		};

		Self {
			must_mode: model.must.mode(),
			must: lower(dictionary.resolve_all(model.must.terms(), language)),
			exclude: lower(dictionary.resolve_all(model.exclude.terms(), language)),
		}
	}

	pub fn is_noop(&self) -> bool {
		self.must.is_empty() && self.exclude.is_empty()
	}

	pub fn matches(&self, unit: &KnowledgeUnit) -> bool {
		let text = unit.filter_text();

		self.matches_text(&text)
	}

	pub fn matches_text(&self, text: &str) -> bool {
		let must_ok = self.must.is_empty()
			|| match self.must_mode {
				MustMode::All => self.must.iter().all(|term| text.contains(term.as_str())),
				MustMode::Any => self.must.iter().any(|term| text.contains(term.as_str())),
			};

		must_ok && !self.exclude.iter().any(|term| text.contains(term.as_str()))
	}
}

/// Keeps units dated inside the slice. Undated units are kept and marked.
pub fn apply_time_slice(units: Vec<KnowledgeUnit>, slice: &TimeSlice) -> Vec<KnowledgeUnit> {
	units
		.into_iter()
		.filter_map(|mut unit| match unit.date_at {
			Some(date) if slice.contains(date) => Some(unit),
			Some(_) => None,
			None => {
				unit.mark_date_unknown();

				Some(unit)
			},
		})
		.collect()
}
