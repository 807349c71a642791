use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	#[serde(default)]
	pub reindex: Reindex,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
	#[serde(default = "default_bind_localhost_only")]
	pub bind_localhost_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	pub default_page_size: u32,
	pub max_page_size: u32,
	pub timeout_ms: u64,
	/// Comma-separated equivalence rules, e.g. "lolf, loi de finance".
	#[serde(default = "default_synonyms")]
	pub synonyms: Vec<String>,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub similarity: Similarity,
	/// Keyed by entity type name. Order inside each list is preserved. Omitting the section keeps
	/// the dataservice popularity functions from `default_score_functions`.
	#[serde(default = "default_score_functions")]
	pub score_functions: BTreeMap<String, Vec<ScoreFunction>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreFunction {
	pub field: String,
	pub factor: f64,
	#[serde(default = "default_modifier")]
	pub modifier: String,
	#[serde(default = "default_missing")]
	pub missing: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub base_backoff_ms: u64,
	pub max_backoff_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 3, base_backoff_ms: 100, max_backoff_ms: 2_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Similarity {
	pub k1: f32,
	pub b: f32,
}
impl Default for Similarity {
	fn default() -> Self {
		Self { k1: 1.2, b: 0.75 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Reindex {
	/// Either "sync" (write on the mutation path) or "queued" (deferred to the reindex worker).
	pub mode: String,
	pub queue_capacity: usize,
	pub retry: Retry,
}
impl Default for Reindex {
	fn default() -> Self {
		Self { mode: "sync".to_string(), queue_capacity: 1_024, retry: Retry::default() }
	}
}

pub fn default_synonyms() -> Vec<String> {
	[
		"AMD, administrateur ministériel des données, AMDAC",
		"lolf, loi de finance",
		"waldec, RNA, répertoire national des associations",
		"ovq, baromètre des résultats",
		"contour, découpage",
		"rp, recensement de la population",
	]
	.into_iter()
	.map(str::to_string)
	.collect()
}

pub fn default_score_functions() -> BTreeMap<String, Vec<ScoreFunction>> {
	let sqrt = |field: &str, factor: f64| ScoreFunction {
		field: field.to_string(),
		factor,
		modifier: "sqrt".to_string(),
		missing: 1.0,
	};

	BTreeMap::from([(
		"dataservice".to_string(),
		vec![
			sqrt("public_service_score", 8.0),
			sqrt("metrics.followers", 4.0),
			sqrt("metrics.views", 1.0),
		],
	)])
}

fn default_bind_localhost_only() -> bool {
	true
}

fn default_modifier() -> String {
	"none".to_string()
}

fn default_missing() -> f64 {
	1.0
}
