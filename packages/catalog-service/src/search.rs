pub mod query;

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catalog_domain::{
	EntityType, Filter, Query, Sort, SortOrder,
	document::{
		KEYWORD_DATASET, KEYWORD_ORGANIZATION, KEYWORD_TAG, SORT_CREATED_AT,
		SORT_FOLLOWERS, SORT_METADATA_MODIFIED_AT, SORT_TITLE, SORT_VIEWS,
	},
};

use crate::{
	Error, IndexQuery, Result, SearchService,
	retry::{self, RetryError},
};

pub const SORT_FIELDS: [&str; 5] =
	[SORT_TITLE, SORT_CREATED_AT, SORT_METADATA_MODIFIED_AT, SORT_FOLLOWERS, SORT_VIEWS];

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	#[serde(default)]
	pub q: String,
	#[serde(default)]
	pub filters: BTreeMap<String, String>,
	pub sort: Option<String>,
	pub page: Option<u32>,
	pub page_size: Option<u32>,
}
impl SearchRequest {
	pub fn text(q: impl Into<String>) -> Self {
		Self { q: q.into(), ..Self::default() }
	}

	pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.filters.insert(key.into(), value.into());

		self
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
	pub id: Uuid,
	pub score: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchPage {
	pub hits: Vec<SearchHit>,
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	pub next_page: Option<u32>,
	pub previous_page: Option<u32>,
	/// `false` when the index could not be reached and the page is a degraded empty result.
	pub available: bool,
}
impl SearchPage {
	fn new(hits: Vec<SearchHit>, total: u64, page: u32, page_size: u32) -> Self {
		let seen = u64::from(page).saturating_mul(u64::from(page_size));

		Self {
			hits,
			total,
			page,
			page_size,
			next_page: (seen < total).then(|| page.saturating_add(1)),
			previous_page: (page > 1).then(|| page - 1),
			available: true,
		}
	}

	fn unavailable(page: u32, page_size: u32) -> Self {
		Self { available: false, ..Self::new(Vec::new(), 0, page, page_size) }
	}
}

struct SearchPlan {
	query: Query,
	filters: Vec<Filter>,
	sort: Sort,
	page: u32,
	page_size: u32,
}

impl SearchService {
	/// Runs a search and degrades to an empty page flagged `available = false` when the index
	/// stays unreachable after retries. Invalid requests are still rejected.
	pub async fn search(
		&self,
		entity_type: EntityType,
		request: &SearchRequest,
	) -> Result<SearchPage> {
		match self.try_search(entity_type, request).await {
			Err(Error::SearchUnavailable { message }) => {
				let (page, page_size) = self.pagination(request)?;

				tracing::warn!(
					entity_type = %entity_type,
					error = %message,
					"Search index unavailable. Returning degraded page."
				);

				Ok(SearchPage::unavailable(page, page_size))
			},
			other => other,
		}
	}

	pub async fn try_search(
		&self,
		entity_type: EntityType,
		request: &SearchRequest,
	) -> Result<SearchPage> {
		let plan = self.plan(entity_type, request)?;
		let index_query = IndexQuery {
			entity_type,
			query: &plan.query,
			filters: &plan.filters,
			sort: &plan.sort,
			page: plan.page,
			page_size: plan.page_size,
		};
		let timeout = Duration::from_millis(self.cfg.search.timeout_ms);
		let result = retry::run(&self.cfg.search.retry, timeout, "search", || {
			self.index.query(index_query)
		})
		.await;
		let found = match result {
			Ok(found) => found,
			Err(RetryError::Rejected(message)) => return Err(Error::InvalidQuery { message }),
			Err(RetryError::Exhausted { attempts, message }) =>
				return Err(Error::SearchUnavailable {
					message: format!("{message} ({attempts} attempts)"),
				}),
		};
		let hits =
			found.hits.into_iter().map(|hit| SearchHit { id: hit.id, score: hit.score }).collect();

		Ok(SearchPage::new(hits, found.total, plan.page, plan.page_size))
	}

	fn plan(&self, entity_type: EntityType, request: &SearchRequest) -> Result<SearchPlan> {
		let (page, page_size) = self.pagination(request)?;
		let mut filters = self.strategy(entity_type).filters();

		for (key, value) in &request.filters {
			filters.push(parse_filter(key, value)?);
		}

		let sort = parse_sort(request.sort.as_deref())?;
		let query = query::build_search_query(&request.q, self.registry.specs_for(entity_type));

		Ok(SearchPlan { query, filters, sort, page, page_size })
	}

	fn pagination(&self, request: &SearchRequest) -> Result<(u32, u32)> {
		let page = request.page.unwrap_or(1);
		let page_size = request.page_size.unwrap_or(self.cfg.search.default_page_size);

		if page == 0 {
			return Err(Error::InvalidQuery { message: "page must be at least 1.".to_string() });
		}
		if page_size == 0 {
			return Err(Error::InvalidQuery {
				message: "page_size must be at least 1.".to_string(),
			});
		}

		Ok((page, page_size.min(self.cfg.search.max_page_size)))
	}
}

pub fn parse_filter(key: &str, value: &str) -> Result<Filter> {
	let value = value.trim();

	match key {
		KEYWORD_DATASET | KEYWORD_ORGANIZATION => {
			let id = Uuid::parse_str(value).map_err(|_| Error::InvalidQuery {
				message: format!("{key} filter must be a valid identifier."),
			})?;

			Ok(Filter::term(key, id.to_string()))
		},
		KEYWORD_TAG if !value.is_empty() => Ok(Filter::term(key, value)),
		KEYWORD_TAG =>
			Err(Error::InvalidQuery { message: "tag filter must not be empty.".to_string() }),
		_ => Err(Error::InvalidQuery { message: format!("Unknown filter {key:?}.") }),
	}
}

/// `None` or an empty string sorts by relevance; `-field` sorts descending.
pub fn parse_sort(raw: Option<&str>) -> Result<Sort> {
	let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
		return Ok(Sort::Relevance);
	};
	let (field, order) = match raw.strip_prefix('-') {
		Some(field) => (field, SortOrder::Desc),
		None => (raw, SortOrder::Asc),
	};

	if !SORT_FIELDS.contains(&field) {
		return Err(Error::InvalidQuery { message: format!("Unknown sort field {field:?}.") });
	}

	Ok(Sort::Field { field: field.to_string(), order })
}
