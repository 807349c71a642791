//! In-process relevance index. Documents are analyzed once at write time and scored with BM25
//! against per-field statistics gathered over the live documents of an entity type.

use std::{
	cmp::Ordering,
	collections::{BTreeMap, HashMap},
	sync::RwLock,
};

use uuid::Uuid;

use catalog_config::{Search, Similarity};
use catalog_domain::{
	BoolQuery, BoostMode, EntityType, FieldBoost, Filter, FunctionScoreQuery, Fuzziness,
	IndexDocument, MatchQuery, MultiMatchKind, MultiMatchQuery, Operator, Query,
	ScoreFunctionSpec, ScoreMode, Sort, SortOrder, SortValue,
};

use crate::{
	Error, Result,
	analysis::{Analyzer, Token},
	fuzzy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
	Applied,
	/// The index already holds a newer version of the document.
	Stale,
	/// A delete recorded its tombstone but found no live document to remove.
	Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
	pub id: Uuid,
	pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexPage {
	pub hits: Vec<IndexHit>,
	pub total: u64,
}

pub struct MemoryIndex {
	analyzer: Analyzer,
	similarity: Similarity,
	shards: RwLock<BTreeMap<EntityType, Shard>>,
}
impl MemoryIndex {
	pub fn new(analyzer: Analyzer, similarity: Similarity) -> Self {
		Self { analyzer, similarity, shards: RwLock::new(BTreeMap::new()) }
	}

	pub fn from_config(cfg: &Search) -> Self {
		Self::new(Analyzer::french(&cfg.synonyms), cfg.similarity.clone())
	}

	/// Writes `document` unless a newer version, live or deleted, is already stored. Re-applying
	/// the same version replaces the document with identical content.
	pub fn upsert(&self, document: IndexDocument) -> Result<WriteOutcome> {
		let mut shards = self.shards.write().map_err(|_| Error::poisoned("Index"))?;
		let shard = shards.entry(document.entity_type).or_default();

		if shard.slots.get(&document.id).is_some_and(|slot| slot.version() > document.version) {
			return Ok(WriteOutcome::Stale);
		}

		let fields = document
			.text
			.iter()
			.map(|(field, text)| (field.clone(), AnalyzedField::new(self.analyzer.analyze(text))))
			.collect();

		shard.slots.insert(document.id, Slot::Live(Box::new(StoredDocument { document, fields })));

		Ok(WriteOutcome::Applied)
	}

	/// Leaves a tombstone at `version` so later writes of older versions are ignored.
	///
	/// Tombstones are never reclaimed: a shard holds one slot per id it has ever seen, so memory
	/// grows with the number of distinct deleted ids for the lifetime of the index.
	pub fn delete(&self, entity_type: EntityType, id: Uuid, version: u64) -> Result<WriteOutcome> {
		let mut shards = self.shards.write().map_err(|_| Error::poisoned("Index"))?;
		let shard = shards.entry(entity_type).or_default();

		if shard.slots.get(&id).is_some_and(|slot| slot.version() > version) {
			return Ok(WriteOutcome::Stale);
		}

		match shard.slots.insert(id, Slot::Tombstone { version }) {
			Some(Slot::Live(_)) => Ok(WriteOutcome::Applied),
			_ => Ok(WriteOutcome::Absent),
		}
	}

	pub fn get(&self, entity_type: EntityType, id: Uuid) -> Result<Option<IndexDocument>> {
		let shards = self.shards.read().map_err(|_| Error::poisoned("Index"))?;

		Ok(shards.get(&entity_type).and_then(|shard| match shard.slots.get(&id) {
			Some(Slot::Live(stored)) => Some(stored.document.clone()),
			_ => None,
		}))
	}

	pub fn live_ids(&self, entity_type: EntityType) -> Result<Vec<Uuid>> {
		let shards = self.shards.read().map_err(|_| Error::poisoned("Index"))?;

		Ok(shards
			.get(&entity_type)
			.map(|shard| shard.live().map(|stored| stored.document.id).collect())
			.unwrap_or_default())
	}

	/// Runs `query` with `filters` applied on top, ordered by `sort` and then by ascending id.
	/// `page` is 1-based.
	pub fn query(
		&self,
		entity_type: EntityType,
		query: &Query,
		filters: &[Filter],
		sort: &Sort,
		page: u32,
		page_size: u32,
	) -> Result<IndexPage> {
		if page == 0 {
			return Err(Error::InvalidArgument("page must be at least 1.".to_string()));
		}
		if page_size == 0 {
			return Err(Error::InvalidArgument("page_size must be at least 1.".to_string()));
		}

		let shards = self.shards.read().map_err(|_| Error::poisoned("Index"))?;
		let Some(shard) = shards.get(&entity_type) else {
			return Ok(IndexPage::default());
		};
		let stats = CorpusStats::collect(shard);
		let scorer = Scorer { similarity: &self.similarity, stats: &stats };
		let compiled = Compiled::new(&self.analyzer, query);
		let mut ranked: Vec<Ranked<'_>> = shard
			.live()
			.filter(|stored| filters.iter().all(|filter| matches_filter(&stored.document, filter)))
			.filter_map(|stored| {
				scorer.score(&compiled, stored).map(|score| Ranked { stored, score })
			})
			.collect();

		ranked.sort_by(|a, b| compare_ranked(sort, a, b));

		let total = ranked.len() as u64;
		let offset = (page as usize - 1).saturating_mul(page_size as usize);
		let hits = ranked
			.into_iter()
			.skip(offset)
			.take(page_size as usize)
			.map(|ranked| IndexHit { id: ranked.stored.document.id, score: ranked.score })
			.collect();

		Ok(IndexPage { hits, total })
	}
}

#[derive(Default)]
struct Shard {
	slots: BTreeMap<Uuid, Slot>,
}
impl Shard {
	fn live(&self) -> impl Iterator<Item = &StoredDocument> {
		self.slots.values().filter_map(|slot| match slot {
			Slot::Live(stored) => Some(stored.as_ref()),
			Slot::Tombstone { .. } => None,
		})
	}
}

enum Slot {
	Live(Box<StoredDocument>),
	Tombstone { version: u64 },
}
impl Slot {
	fn version(&self) -> u64 {
		match self {
			Self::Live(stored) => stored.document.version,
			Self::Tombstone { version } => *version,
		}
	}
}

struct StoredDocument {
	document: IndexDocument,
	fields: BTreeMap<String, AnalyzedField>,
}

struct AnalyzedField {
	postings: HashMap<String, Vec<usize>>,
	length: usize,
}
impl AnalyzedField {
	fn new(tokens: Vec<Token>) -> Self {
		let length = tokens.len();
		let mut postings: HashMap<String, Vec<usize>> = HashMap::new();

		for token in tokens {
			postings.entry(token.term).or_default().push(token.position);
		}

		Self { postings, length }
	}

	fn freq(&self, term: &str) -> usize {
		self.postings.get(term).map_or(0, Vec::len)
	}

	fn has_position(&self, term: &str, position: usize) -> bool {
		self.postings.get(term).is_some_and(|positions| positions.contains(&position))
	}
}

#[derive(Default)]
struct FieldStats {
	doc_count: usize,
	total_length: usize,
	doc_freq: HashMap<String, usize>,
}
impl FieldStats {
	fn idf(&self, term: &str) -> f64 {
		let docs = self.doc_count as f64;
		let df = self.doc_freq.get(term).copied().unwrap_or(0) as f64;

		(1.0 + (docs - df + 0.5) / (df + 0.5)).ln()
	}

	fn avg_length(&self) -> f64 {
		if self.doc_count == 0 {
			return 1.0;
		}

		(self.total_length as f64 / self.doc_count as f64).max(f64::EPSILON)
	}
}

struct CorpusStats {
	fields: HashMap<String, FieldStats>,
}
impl CorpusStats {
	fn collect(shard: &Shard) -> Self {
		let mut fields: HashMap<String, FieldStats> = HashMap::new();

		for stored in shard.live() {
			for (field, analyzed) in &stored.fields {
				let stats = fields.entry(field.clone()).or_default();

				stats.doc_count += 1;
				stats.total_length += analyzed.length;

				for term in analyzed.postings.keys() {
					*stats.doc_freq.entry(term.clone()).or_default() += 1;
				}
			}
		}

		Self { fields }
	}
}

/// Query tree with its text already analyzed.
enum Compiled {
	MatchAll,
	Bool { must: Vec<Compiled>, should: Vec<Compiled>, filter: Vec<Filter> },
	FunctionScore {
		query: Box<Compiled>,
		functions: Vec<ScoreFunctionSpec>,
		score_mode: ScoreMode,
		boost_mode: BoostMode,
	},
	Phrase { tokens: Vec<Token>, fields: Vec<FieldBoost> },
	CrossFields { terms: Vec<String>, fields: Vec<FieldBoost>, operator: Operator },
	Terms { field: String, terms: Vec<String>, fuzziness: Fuzziness, operator: Operator },
}
impl Compiled {
	fn new(analyzer: &Analyzer, query: &Query) -> Self {
		match query {
			Query::MatchAll => Self::MatchAll,
			Query::Bool(BoolQuery { must, should, filter }) => Self::Bool {
				must: must.iter().map(|clause| Self::new(analyzer, clause)).collect(),
				should: should.iter().map(|clause| Self::new(analyzer, clause)).collect(),
				filter: filter.clone(),
			},
			Query::FunctionScore(FunctionScoreQuery { query, functions, score_mode, boost_mode }) =>
				Self::FunctionScore {
					query: Box::new(Self::new(analyzer, query)),
					functions: functions.clone(),
					score_mode: *score_mode,
					boost_mode: *boost_mode,
				},
			Query::MultiMatch(MultiMatchQuery { text, kind, fields, operator }) => match kind {
				MultiMatchKind::Phrase =>
					Self::Phrase { tokens: analyzer.analyze(text), fields: fields.clone() },
				MultiMatchKind::CrossFields => Self::CrossFields {
					terms: analyzer.terms(text),
					fields: fields.clone(),
					operator: *operator,
				},
			},
			Query::Match(MatchQuery { field, text, fuzziness, operator }) => Self::Terms {
				field: field.clone(),
				terms: analyzer.terms(text),
				fuzziness: *fuzziness,
				operator: *operator,
			},
		}
	}
}

struct Scorer<'a> {
	similarity: &'a Similarity,
	stats: &'a CorpusStats,
}
impl Scorer<'_> {
	/// `None` when the document does not match.
	fn score(&self, query: &Compiled, stored: &StoredDocument) -> Option<f64> {
		match query {
			Compiled::MatchAll => Some(1.0),
			Compiled::Bool { must, should, filter } => {
				if !filter.iter().all(|filter| matches_filter(&stored.document, filter)) {
					return None;
				}

				let mut total = 0.0;

				for clause in must {
					total += self.score(clause, stored)?;
				}

				let mut any_should = false;

				for clause in should {
					if let Some(score) = self.score(clause, stored) {
						total += score;
						any_should = true;
					}
				}

				if must.is_empty() && !should.is_empty() && !any_should {
					return None;
				}

				Some(total)
			},
			Compiled::FunctionScore { query, functions, score_mode, boost_mode } => {
				let base = self.score(query, stored)?;

				if functions.is_empty() {
					return Some(base);
				}

				let values = functions
					.iter()
					.map(|spec| spec.evaluate(stored.document.numbers.get(&spec.field).copied()));
				let combined: f64 = match score_mode {
					ScoreMode::Sum => values.sum(),
					ScoreMode::Multiply => values.product(),
				};

				Some(match boost_mode {
					BoostMode::Multiply => base * combined,
					BoostMode::Sum => base + combined,
					BoostMode::Replace => combined,
				})
			},
			Compiled::Phrase { tokens, fields } => self.phrase(tokens, fields, stored),
			Compiled::CrossFields { terms, fields, operator } =>
				self.cross_fields(terms, fields, *operator, stored),
			Compiled::Terms { field, terms, fuzziness, operator } =>
				self.terms(field, terms, *fuzziness, *operator, stored),
		}
	}

	fn phrase(
		&self,
		tokens: &[Token],
		fields: &[FieldBoost],
		stored: &StoredDocument,
	) -> Option<f64> {
		let first = tokens.first()?;

		fields
			.iter()
			.filter_map(|boost| {
				let analyzed = stored.fields.get(&boost.field)?;
				let stats = self.stats.fields.get(&boost.field)?;
				let starts = analyzed.postings.get(&first.term)?;
				let freq = starts
					.iter()
					.filter(|start| {
						tokens.iter().all(|token| {
							let position = **start + token.position - first.position;

							analyzed.has_position(&token.term, position)
						})
					})
					.count();

				if freq == 0 {
					return None;
				}

				let idf: f64 = tokens.iter().map(|token| stats.idf(&token.term)).sum();

				Some(boost.boost * idf * self.tf_norm(stats, freq, analyzed.length))
			})
			.max_by(f64::total_cmp)
	}

	fn cross_fields(
		&self,
		terms: &[String],
		fields: &[FieldBoost],
		operator: Operator,
		stored: &StoredDocument,
	) -> Option<f64> {
		let mut total = 0.0;
		let mut matched = 0_usize;

		for term in terms {
			let best = fields
				.iter()
				.filter_map(|boost| {
					let analyzed = stored.fields.get(&boost.field)?;
					let stats = self.stats.fields.get(&boost.field)?;
					let freq = analyzed.freq(term);

					if freq == 0 {
						return None;
					}

					Some(boost.boost * stats.idf(term) * self.tf_norm(stats, freq, analyzed.length))
				})
				.max_by(f64::total_cmp);

			match best {
				Some(score) => {
					total += score;
					matched += 1;
				},
				None if operator == Operator::And => return None,
				None => {},
			}
		}

		(matched > 0).then_some(total)
	}

	fn terms(
		&self,
		field: &str,
		terms: &[String],
		fuzziness: Fuzziness,
		operator: Operator,
		stored: &StoredDocument,
	) -> Option<f64> {
		let analyzed = stored.fields.get(field)?;
		let stats = self.stats.fields.get(field)?;
		let mut total = 0.0;
		let mut matched = 0_usize;

		for term in terms {
			let term_len = term.chars().count();
			let max_edits = fuzziness.max_edits(term_len);
			let best = analyzed
				.postings
				.iter()
				.filter_map(|(candidate, positions)| {
					let distance = fuzzy::distance_within(term, candidate, max_edits)?;
					let longest = term_len.max(candidate.chars().count()).max(1) as f64;
					let similarity = 1.0 - distance as f64 / longest;

					let tf = self.tf_norm(stats, positions.len(), analyzed.length);

					Some(similarity * stats.idf(candidate) * tf)
				})
				.max_by(f64::total_cmp);

			match best {
				Some(score) => {
					total += score;
					matched += 1;
				},
				None if operator == Operator::And => return None,
				None => {},
			}
		}

		(matched > 0).then_some(total)
	}

	fn tf_norm(&self, stats: &FieldStats, freq: usize, length: usize) -> f64 {
		let (k1, b) = (f64::from(self.similarity.k1), f64::from(self.similarity.b));
		let freq = freq as f64;
		let norm = k1 * (1.0 - b + b * length as f64 / stats.avg_length());

		freq * (k1 + 1.0) / (freq + norm)
	}
}

struct Ranked<'a> {
	stored: &'a StoredDocument,
	score: f64,
}

fn matches_filter(document: &IndexDocument, filter: &Filter) -> bool {
	match filter {
		Filter::Term { field, value } =>
			document.keywords.get(field).is_some_and(|values| values.iter().any(|v| v == value)),
		Filter::Flag { field, value } =>
			document.flags.get(field).copied().unwrap_or(false) == *value,
	}
}

fn compare_ranked(sort: &Sort, a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
	let primary = match sort {
		Sort::Relevance => Ordering::Equal,
		Sort::Field { field, order } => compare_sort_keys(
			a.stored.document.sort_keys.get(field),
			b.stored.document.sort_keys.get(field),
			*order,
		),
	};

	primary
		.then_with(|| b.score.total_cmp(&a.score))
		.then_with(|| a.stored.document.id.cmp(&b.stored.document.id))
}

// Documents without the key sort last in either direction.
fn compare_sort_keys(a: Option<&SortValue>, b: Option<&SortValue>, order: SortOrder) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => {
			let ordering = match (a, b) {
				(SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
				(SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
				(SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
				(SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
			};

			match order {
				SortOrder::Asc => ordering,
				SortOrder::Desc => ordering.reverse(),
			}
		},
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}
