use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EntityType, SearchableRecord};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_ACRONYM: &str = "acronym";
pub const FIELD_DESCRIPTION: &str = "description";

pub const KEYWORD_DATASET: &str = "dataset";
pub const KEYWORD_ORGANIZATION: &str = "organization";
pub const KEYWORD_TAG: &str = "tag";

pub const FLAG_PRIVATE: &str = "private";
pub const FLAG_ARCHIVED: &str = "archived";
pub const FLAG_DELETED: &str = "deleted";

pub const SORT_TITLE: &str = "title";
pub const SORT_CREATED_AT: &str = "created_at";
pub const SORT_METADATA_MODIFIED_AT: &str = "metadata_modified_at";
pub const SORT_FOLLOWERS: &str = "followers";
pub const SORT_VIEWS: &str = "views";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortValue {
	Number(f64),
	Text(String),
}

/// Denormalized projection of a record holding only what matching, filtering, scoring and
/// sorting need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
	pub id: Uuid,
	pub entity_type: EntityType,
	pub version: u64,
	pub text: BTreeMap<String, String>,
	pub numbers: BTreeMap<String, f64>,
	pub keywords: BTreeMap<String, Vec<String>>,
	pub flags: BTreeMap<String, bool>,
	pub sort_keys: BTreeMap<String, SortValue>,
}
impl IndexDocument {
	pub fn project(record: &SearchableRecord) -> Self {
		let mut text = BTreeMap::new();

		text.insert(FIELD_TITLE.to_string(), record.title.clone());

		if let Some(acronym) = record.acronym.as_ref()
			&& !acronym.trim().is_empty()
		{
			text.insert(FIELD_ACRONYM.to_string(), acronym.clone());
		}
		if !record.description.trim().is_empty() {
			text.insert(FIELD_DESCRIPTION.to_string(), record.description.clone());
		}

		let mut keywords = BTreeMap::new();

		keywords.insert(
			KEYWORD_DATASET.to_string(),
			record.datasets.iter().map(Uuid::to_string).collect(),
		);
		keywords.insert(
			KEYWORD_ORGANIZATION.to_string(),
			record.organization.iter().map(|organization| organization.id.to_string()).collect(),
		);
		keywords.insert(KEYWORD_TAG.to_string(), record.tags.clone());

		let mut flags = BTreeMap::new();

		flags.insert(FLAG_PRIVATE.to_string(), record.private);
		flags.insert(FLAG_ARCHIVED.to_string(), record.archived_at.is_some());
		flags.insert(FLAG_DELETED.to_string(), record.deleted_at.is_some());

		let mut sort_keys = BTreeMap::new();

		sort_keys.insert(SORT_TITLE.to_string(), SortValue::Text(record.title.to_lowercase()));
		sort_keys.insert(
			SORT_CREATED_AT.to_string(),
			SortValue::Number(record.created_at.unix_timestamp() as f64),
		);
		sort_keys.insert(
			SORT_METADATA_MODIFIED_AT.to_string(),
			SortValue::Number(record.metadata_modified_at.unix_timestamp() as f64),
		);
		sort_keys.insert(
			SORT_FOLLOWERS.to_string(),
			SortValue::Number(record.metric("followers").unwrap_or(0.0)),
		);
		sort_keys.insert(
			SORT_VIEWS.to_string(),
			SortValue::Number(record.metric("views").unwrap_or(0.0)),
		);

		Self {
			id: record.id,
			entity_type: record.entity_type,
			version: record.revision,
			text,
			numbers: record.numeric_fields(),
			keywords,
			flags,
			sort_keys,
		}
	}

	pub fn text_field(&self, field: &str) -> Option<&str> {
		self.text.get(field).map(String::as_str)
	}
}
