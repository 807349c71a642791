//! Index-agnostic query tree. Built by the search service, interpreted by an index store.

use crate::ScoreFunctionSpec;

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
	MatchAll,
	Bool(BoolQuery),
	FunctionScore(FunctionScoreQuery),
	MultiMatch(MultiMatchQuery),
	Match(MatchQuery),
}

/// A document matches when every `must` clause and every `filter` matches, and, when `must` is
/// empty, at least one `should` clause matches. Scores of matching `must` and `should` clauses
/// are summed; filters never score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
	pub must: Vec<Query>,
	pub should: Vec<Query>,
	pub filter: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionScoreQuery {
	pub query: Box<Query>,
	pub functions: Vec<ScoreFunctionSpec>,
	pub score_mode: ScoreMode,
	pub boost_mode: BoostMode,
}

/// How score function results combine with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMode {
	Sum,
	Multiply,
}

/// How the combined function score merges with the wrapped query score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostMode {
	Multiply,
	Sum,
	Replace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiMatchQuery {
	pub text: String,
	pub kind: MultiMatchKind,
	pub fields: Vec<FieldBoost>,
	pub operator: Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiMatchKind {
	/// Terms must occur at consecutive positions within one field; best field wins.
	Phrase,
	/// Fields are treated as one combined field; each term scores on its best field.
	CrossFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldBoost {
	pub field: String,
	pub boost: f64,
}
impl FieldBoost {
	pub fn new(field: impl Into<String>, boost: f64) -> Self {
		Self { field: field.into(), boost }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
	Or,
	And,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
	pub field: String,
	pub text: String,
	pub fuzziness: Fuzziness,
	pub operator: Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fuzziness {
	Exact,
	/// No edit below `low` chars, one edit below `high`, two edits from `high` on.
	Auto { low: usize, high: usize },
}
impl Fuzziness {
	pub fn max_edits(self, term_len: usize) -> usize {
		match self {
			Self::Exact => 0,
			Self::Auto { low, high } =>
				if term_len < low {
					0
				} else if term_len < high {
					1
				} else {
					2
				},
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
	/// Exact keyword equality against any value of a multi-valued keyword field.
	Term { field: String, value: String },
	Flag { field: String, value: bool },
}
impl Filter {
	pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Term { field: field.into(), value: value.into() }
	}

	pub fn flag(field: impl Into<String>, value: bool) -> Self {
		Self::Flag { field: field.into(), value }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
	Asc,
	Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Sort {
	/// Descending score.
	#[default]
	Relevance,
	Field { field: String, order: SortOrder },
}
