use std::{collections::BTreeMap, str::FromStr};

use catalog_config::{Error, Result, Search};

use crate::EntityType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
	None,
	Log,
	Log1p,
	Sqrt,
	Square,
	Reciprocal,
}
impl Modifier {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Log => "log",
			Self::Log1p => "log1p",
			Self::Sqrt => "sqrt",
			Self::Square => "square",
			Self::Reciprocal => "reciprocal",
		}
	}

	/// `log` and `log1p` are base 10.
	pub fn apply(self, value: f64) -> f64 {
		match self {
			Self::None => value,
			Self::Log => value.log10(),
			Self::Log1p => (1.0 + value).log10(),
			Self::Sqrt => value.sqrt(),
			Self::Square => value * value,
			Self::Reciprocal => 1.0 / value,
		}
	}
}

impl FromStr for Modifier {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"none" => Ok(Self::None),
			"log" => Ok(Self::Log),
			"log1p" => Ok(Self::Log1p),
			"sqrt" => Ok(Self::Sqrt),
			"square" => Ok(Self::Square),
			"reciprocal" => Ok(Self::Reciprocal),
			other => Err(Error::Validation {
				message: format!("Unknown score function modifier {other:?}."),
			}),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreFunctionSpec {
	pub field: String,
	pub factor: f64,
	pub modifier: Modifier,
	pub missing: f64,
}
impl ScoreFunctionSpec {
	pub fn new(
		field: impl Into<String>,
		factor: f64,
		modifier: Modifier,
		missing: f64,
	) -> Result<Self> {
		let field = field.into();

		if field.trim().is_empty() {
			return Err(Error::Validation {
				message: "Score function field must be non-empty.".to_string(),
			});
		}
		if !factor.is_finite() || factor <= 0.0 {
			return Err(Error::Validation {
				message: format!("Score function {field} factor must be greater than zero."),
			});
		}
		if !missing.is_finite() {
			return Err(Error::Validation {
				message: format!("Score function {field} missing must be a finite number."),
			});
		}

		Ok(Self { field, factor, modifier, missing })
	}

	/// `factor × modifier(value)`, substituting `missing` for an absent value. Results that are
	/// negative or not finite (e.g. `log(0)`) contribute nothing.
	pub fn evaluate(&self, value: Option<f64>) -> f64 {
		let value = value.filter(|value| value.is_finite()).unwrap_or(self.missing);
		let score = self.factor * self.modifier.apply(value);

		if score.is_finite() && score > 0.0 { score } else { 0.0 }
	}
}

/// Per entity type, the ordered score functions blended into text relevance.
#[derive(Debug, Clone, Default)]
pub struct ScoreFunctionRegistry {
	by_entity: BTreeMap<EntityType, Vec<ScoreFunctionSpec>>,
}
impl ScoreFunctionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_config(cfg: &Search) -> Result<Self> {
		let mut registry = Self::new();

		for (entity, functions) in &cfg.score_functions {
			let entity_type = EntityType::parse(entity).ok_or_else(|| Error::Validation {
				message: format!("search.score_functions.{entity} is not a known entity type."),
			})?;
			let mut specs = Vec::with_capacity(functions.len());

			for function in functions {
				catalog_config::validate_score_function(entity, function)?;

				let modifier = function.modifier.parse::<Modifier>()?;

				specs.push(ScoreFunctionSpec::new(
					function.field.clone(),
					function.factor,
					modifier,
					function.missing,
				)?);
			}

			registry.by_entity.insert(entity_type, specs);
		}

		Ok(registry)
	}

	pub fn with_specs(mut self, entity_type: EntityType, specs: Vec<ScoreFunctionSpec>) -> Self {
		self.by_entity.insert(entity_type, specs);

		self
	}

	pub fn specs_for(&self, entity_type: EntityType) -> &[ScoreFunctionSpec] {
		self.by_entity.get(&entity_type).map(Vec::as_slice).unwrap_or(&[])
	}
}
