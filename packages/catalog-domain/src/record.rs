use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::EntityType;

pub const PUBLIC_SERVICE_SCORE: f64 = 4.0;
pub const DEFAULT_SERVICE_SCORE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRef {
	pub id: Uuid,
	#[serde(default)]
	pub public_service: bool,
}

/// Catalog entity state as seen by the search core. The source of truth lives elsewhere; this
/// is a read-only snapshot handed over by the record provider or the mutation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableRecord {
	pub id: Uuid,
	pub entity_type: EntityType,
	pub title: String,
	#[serde(default)]
	pub acronym: Option<String>,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub metrics: BTreeMap<String, f64>,
	#[serde(default)]
	pub organization: Option<OrganizationRef>,
	#[serde(default)]
	pub datasets: Vec<Uuid>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub private: bool,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub metadata_modified_at: OffsetDateTime,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub deleted_at: Option<OffsetDateTime>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub archived_at: Option<OffsetDateTime>,
	/// Bumped on every mutation. Index writes carry it as an external version.
	#[serde(default)]
	pub revision: u64,
}
impl SearchableRecord {
	pub fn new(
		id: Uuid,
		entity_type: EntityType,
		title: impl Into<String>,
		now: OffsetDateTime,
	) -> Self {
		Self {
			id,
			entity_type,
			title: title.into(),
			acronym: None,
			description: String::new(),
			metrics: BTreeMap::new(),
			organization: None,
			datasets: Vec::new(),
			tags: Vec::new(),
			private: false,
			created_at: now,
			metadata_modified_at: now,
			deleted_at: None,
			archived_at: None,
			revision: 1,
		}
	}

	pub fn metric(&self, name: &str) -> Option<f64> {
		self.metrics.get(name).copied()
	}

	/// 4 for records owned by a public-service organization, otherwise 1. Must stay non-zero:
	/// score functions multiply into text relevance.
	pub fn public_service_score(&self) -> f64 {
		match &self.organization {
			Some(organization) if organization.public_service => PUBLIC_SERVICE_SCORE,
			_ => DEFAULT_SERVICE_SCORE,
		}
	}

	/// Numeric attributes addressable by score functions, keyed by field path.
	pub fn numeric_fields(&self) -> BTreeMap<String, f64> {
		let mut out = BTreeMap::new();

		out.insert("public_service_score".to_string(), self.public_service_score());

		for (name, value) in &self.metrics {
			if value.is_finite() {
				out.insert(format!("metrics.{name}"), *value);
			}
		}

		out
	}
}
