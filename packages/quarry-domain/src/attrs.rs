//! Typed views over the open `attrs` bag of a knowledge unit.
//!
//! Each kind stores its payload under its own key (`publication`, `patent`, `webpage`). Unknown
//! fields are preserved in `extra` so a round trip through the typed view loses nothing.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::unit::UnitKind;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issn_l: Option<String>,
	#[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
	pub issn: Vec<String>,
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub venue_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Biblio {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub volume: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub issue: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_page: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_page: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub orcid: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Affiliation {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ror: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country_code: Option<String>,
	#[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
	pub affiliation_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub author: Option<Author>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub author_position: Option<String>,
	#[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
	pub institutions: Vec<Affiliation>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Access {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_oa: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub oa_status: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub oa_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub any_repository_has_fulltext: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cited_by_count: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fwci: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationTopic {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub score: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub level: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
	#[serde(default, deserialize_with = "null_as_default")]
	pub topics: Vec<ClassificationTopic>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationAttrs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub work_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub venue: Option<Venue>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub biblio: Option<Biblio>,
	#[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
	pub contributors: Vec<Contributor>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub access: Option<Access>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metrics: Option<Metrics>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub classification: Option<Classification>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub relations: Option<Value>,
	/// Provider-specific payload keyed by provider name.
	#[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Map::is_empty")]
	pub source_extras: Map<String, Value>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatentAttrs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jurisdiction: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kind_code: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub assignees: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub inventors: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filing_date: Option<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WebpageAttrs {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domain: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub snippet: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_rank: Option<i64>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UnitAttrs {
	Publication(PublicationAttrs),
	Patent(PatentAttrs),
	Webpage(WebpageAttrs),
}
impl UnitAttrs {
	pub fn kind(&self) -> UnitKind {
		match self {
			Self::Publication(_) => UnitKind::Publication,
			Self::Patent(_) => UnitKind::Patent,
			Self::Webpage(_) => UnitKind::Webpage,
		}
	}

	/// Reads the typed payload for `kind`. Returns `None` when the bag has no entry for it.
	pub fn from_bag(kind: UnitKind, bag: &Map<String, Value>) -> serde_json::Result<Option<Self>> {
		let Some(value) = bag.get(kind.as_str()) else {
			return Ok(None);
		};
		let attrs = match kind {
			UnitKind::Publication => Self::Publication(serde_json::from_value(value.clone())?),
			UnitKind::Patent => Self::Patent(serde_json::from_value(value.clone())?),
			UnitKind::Webpage => Self::Webpage(serde_json::from_value(value.clone())?),
		};

		Ok(Some(attrs))
	}

	/// Writes the payload under its kind key, leaving other keys of the bag intact.
	pub fn write_into(&self, bag: &mut Map<String, Value>) -> serde_json::Result<()> {
		let value = match self {
			Self::Publication(attrs) => serde_json::to_value(attrs)?,
			Self::Patent(attrs) => serde_json::to_value(attrs)?,
			Self::Webpage(attrs) => serde_json::to_value(attrs)?,
		};

		bag.insert(self.kind().as_str().to_string(), value);

		Ok(())
	}
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
