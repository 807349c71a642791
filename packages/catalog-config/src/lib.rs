mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Reindex, Retry, ScoreFunction, Search, Service, Similarity, default_score_functions,
	default_synonyms,
};

use std::{fs, path::Path};

pub const ENTITY_TYPES: [&str; 4] = ["dataservice", "dataset", "reuse", "organization"];
pub const SCORE_MODIFIERS: [&str; 6] = ["none", "log", "log1p", "sqrt", "square", "reciprocal"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("service.log_level", &cfg.service.log_level),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.search.max_page_size == 0 {
		return Err(Error::Validation {
			message: "search.max_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_page_size == 0 {
		return Err(Error::Validation {
			message: "search.default_page_size must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_page_size > cfg.search.max_page_size {
		return Err(Error::Validation {
			message: "search.default_page_size must not exceed search.max_page_size.".to_string(),
		});
	}
	if cfg.search.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.timeout_ms must be greater than zero.".to_string(),
		});
	}

	validate_retry("search.retry", &cfg.search.retry)?;
	validate_retry("reindex.retry", &cfg.reindex.retry)?;

	if !cfg.search.similarity.k1.is_finite() || cfg.search.similarity.k1 < 0.0 {
		return Err(Error::Validation {
			message: "search.similarity.k1 must be a finite number, zero or greater.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.search.similarity.b) {
		return Err(Error::Validation {
			message: "search.similarity.b must be in the range 0.0-1.0.".to_string(),
		});
	}

	for rule in &cfg.search.synonyms {
		let alternatives = rule.split(',').filter(|term| !term.trim().is_empty()).count();

		if alternatives < 2 {
			return Err(Error::Validation {
				message: format!("search.synonyms rule {rule:?} must list at least two terms."),
			});
		}
	}

	for (entity, functions) in &cfg.search.score_functions {
		if !ENTITY_TYPES.contains(&entity.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"search.score_functions.{entity} is not a known entity type. Expected one of {}.",
					ENTITY_TYPES.join(", ")
				),
			});
		}

		for function in functions {
			validate_score_function(entity, function)?;
		}
	}

	if !matches!(cfg.reindex.mode.as_str(), "sync" | "queued") {
		return Err(Error::Validation {
			message: "reindex.mode must be one of sync or queued.".to_string(),
		});
	}
	if cfg.reindex.queue_capacity == 0 {
		return Err(Error::Validation {
			message: "reindex.queue_capacity must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

pub fn validate_score_function(entity: &str, function: &ScoreFunction) -> Result<()> {
	if function.field.trim().is_empty() {
		return Err(Error::Validation {
			message: format!("search.score_functions.{entity} field must be non-empty."),
		});
	}
	if !function.factor.is_finite() || function.factor <= 0.0 {
		return Err(Error::Validation {
			message: format!(
				"search.score_functions.{entity}.{} factor must be a finite number greater than zero.",
				function.field
			),
		});
	}
	if !SCORE_MODIFIERS.contains(&function.modifier.as_str()) {
		return Err(Error::Validation {
			message: format!(
				"search.score_functions.{entity}.{} modifier must be one of {}.",
				function.field,
				SCORE_MODIFIERS.join(", ")
			),
		});
	}
	if !function.missing.is_finite() {
		return Err(Error::Validation {
			message: format!(
				"search.score_functions.{entity}.{} missing must be a finite number.",
				function.field
			),
		});
	}

	Ok(())
}

fn validate_retry(label: &str, retry: &Retry) -> Result<()> {
	if retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: format!("{label}.max_attempts must be greater than zero."),
		});
	}
	if retry.base_backoff_ms > retry.max_backoff_ms {
		return Err(Error::Validation {
			message: format!("{label}.base_backoff_ms must not exceed {label}.max_backoff_ms."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
	cfg.reindex.mode = cfg.reindex.mode.trim().to_ascii_lowercase();
	cfg.search.synonyms.retain(|rule| !rule.trim().is_empty());

	for functions in cfg.search.score_functions.values_mut() {
		for function in functions {
			function.field = function.field.trim().to_string();
			function.modifier = function.modifier.trim().to_ascii_lowercase();
		}
	}
}
