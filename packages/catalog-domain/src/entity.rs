use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
	Dataservice,
	Dataset,
	Reuse,
	Organization,
}
impl EntityType {
	pub const ALL: [Self; 4] = [Self::Dataservice, Self::Dataset, Self::Reuse, Self::Organization];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Dataservice => "dataservice",
			Self::Dataset => "dataset",
			Self::Reuse => "reuse",
			Self::Organization => "organization",
		}
	}

	/// Plural form used in API paths, e.g. `/api/2/dataservices/search`.
	pub fn collection(self) -> &'static str {
		match self {
			Self::Dataservice => "dataservices",
			Self::Dataset => "datasets",
			Self::Reuse => "reuses",
			Self::Organization => "organizations",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|entity| entity.as_str() == raw)
	}

	pub fn from_collection(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|entity| entity.collection() == raw || entity.as_str() == raw)
	}
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
