use catalog_domain::{
	BoolQuery, BoostMode, FieldBoost, Fuzziness, FunctionScoreQuery, MatchQuery, MultiMatchKind,
	MultiMatchQuery, Operator, Query, ScoreFunctionSpec, ScoreMode,
	document::{FIELD_ACRONYM, FIELD_DESCRIPTION, FIELD_TITLE},
};

pub const PHRASE_FIELDS: [(&str, f64); 3] =
	[(FIELD_TITLE, 15.0), (FIELD_ACRONYM, 15.0), (FIELD_DESCRIPTION, 8.0)];
pub const CROSS_FIELDS: [(&str, f64); 3] =
	[(FIELD_TITLE, 7.0), (FIELD_ACRONYM, 7.0), (FIELD_DESCRIPTION, 4.0)];
pub const TITLE_FUZZINESS: Fuzziness = Fuzziness::Auto { low: 4, high: 6 };

/// Builds the relevance query for `text`.
///
/// Non-empty text yields a bool of three `should` clauses: a phrase match and an `and`
/// cross-fields match, each multiplied by the summed score functions, plus an unweighted fuzzy
/// title match. Empty text yields the score functions over every document.
pub fn build_search_query(text: &str, specs: &[ScoreFunctionSpec]) -> Query {
	let text = text.trim();

	if text.is_empty() {
		return function_score(Query::MatchAll, specs);
	}

	Query::Bool(BoolQuery {
		must: Vec::new(),
		should: vec![
			function_score(
				multi_match(text, MultiMatchKind::Phrase, &PHRASE_FIELDS, Operator::Or),
				specs,
			),
			function_score(
				multi_match(text, MultiMatchKind::CrossFields, &CROSS_FIELDS, Operator::And),
				specs,
			),
			Query::Match(MatchQuery {
				field: FIELD_TITLE.to_string(),
				text: text.to_string(),
				fuzziness: TITLE_FUZZINESS,
				operator: Operator::Or,
			}),
		],
		filter: Vec::new(),
	})
}

fn multi_match(
	text: &str,
	kind: MultiMatchKind,
	fields: &[(&str, f64)],
	operator: Operator,
) -> Query {
	Query::MultiMatch(MultiMatchQuery {
		text: text.to_string(),
		kind,
		fields: fields.iter().map(|(field, boost)| FieldBoost::new(*field, *boost)).collect(),
		operator,
	})
}

fn function_score(query: Query, specs: &[ScoreFunctionSpec]) -> Query {
	Query::FunctionScore(FunctionScoreQuery {
		query: Box::new(query),
		functions: specs.to_vec(),
		score_mode: ScoreMode::Sum,
		boost_mode: BoostMode::Multiply,
	})
}
