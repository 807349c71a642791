pub mod admin;
pub mod outbox;
pub mod reindex;
pub mod retry;
pub mod search;

mod error;

pub use admin::RebuildReport;
pub use error::{Error, Result};
pub use outbox::{ReindexJob, ReindexQueue};
pub use reindex::{IndexWriteAlert, ReindexAction, ReindexOutcome};
pub use search::{SearchHit, SearchPage, SearchRequest, query::build_search_query};

use std::{future::Future, pin::Pin, sync::Arc};

use uuid::Uuid;

use catalog_config::Config;
use catalog_domain::{
	EntityType, Filter, IndexDocument, Indexability, LifecycleIndexability, Query,
	ScoreFunctionRegistry, SearchableRecord, Sort, Strategies,
};
use catalog_storage::{IndexPage, MemoryIndex, MemoryRecords, WriteOutcome};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One paged, filtered, sorted query against a single entity type.
#[derive(Debug, Clone, Copy)]
pub struct IndexQuery<'a> {
	pub entity_type: EntityType,
	pub query: &'a Query,
	pub filters: &'a [Filter],
	pub sort: &'a Sort,
	pub page: u32,
	pub page_size: u32,
}

/// Writes carry the record revision as an external version; implementations must ignore writes
/// older than the version they hold.
pub trait IndexStore
where
	Self: Send + Sync,
{
	fn upsert<'a>(
		&'a self,
		document: IndexDocument,
	) -> BoxFuture<'a, catalog_storage::Result<WriteOutcome>>;

	fn delete<'a>(
		&'a self,
		entity_type: EntityType,
		id: Uuid,
		version: u64,
	) -> BoxFuture<'a, catalog_storage::Result<WriteOutcome>>;

	fn query<'a>(
		&'a self,
		request: IndexQuery<'a>,
	) -> BoxFuture<'a, catalog_storage::Result<IndexPage>>;
}

pub trait RecordProvider
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		entity_type: EntityType,
		id: Uuid,
	) -> BoxFuture<'a, catalog_storage::Result<Option<SearchableRecord>>>;

	fn list_ids<'a>(
		&'a self,
		entity_type: EntityType,
	) -> BoxFuture<'a, catalog_storage::Result<Vec<Uuid>>>;
}

/// Operational channel for index writes that failed after every retry.
pub trait AlertSink
where
	Self: Send + Sync,
{
	fn index_write_failed(&self, alert: &IndexWriteAlert);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlerts;

#[derive(Clone)]
pub struct SearchService {
	pub cfg: Config,
	pub registry: ScoreFunctionRegistry,
	pub index: Arc<dyn IndexStore>,
	pub records: Arc<dyn RecordProvider>,
	pub strategies: Strategies,
	pub alerts: Arc<dyn AlertSink>,
}
impl SearchService {
	pub fn new(
		cfg: Config,
		index: Arc<dyn IndexStore>,
		records: Arc<dyn RecordProvider>,
	) -> Result<Self> {
		let registry = ScoreFunctionRegistry::from_config(&cfg.search)?;

		Ok(Self {
			cfg,
			registry,
			index,
			records,
			strategies: LifecycleIndexability::default_strategies(),
			alerts: Arc::new(TracingAlerts),
		})
	}

	pub fn with_strategies(mut self, strategies: Strategies) -> Self {
		self.strategies = strategies;

		self
	}

	pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
		self.alerts = alerts;

		self
	}

	pub fn strategy(&self, entity_type: EntityType) -> Arc<dyn Indexability> {
		self.strategies
			.get(&entity_type)
			.cloned()
			.unwrap_or_else(|| Arc::new(LifecycleIndexability::for_entity(entity_type)))
	}

	pub(crate) fn is_indexable(&self, record: Option<&SearchableRecord>) -> bool {
		record.is_some_and(|record| self.strategy(record.entity_type).is_indexable(record))
	}
}

impl IndexStore for MemoryIndex {
	fn upsert<'a>(
		&'a self,
		document: IndexDocument,
	) -> BoxFuture<'a, catalog_storage::Result<WriteOutcome>> {
		Box::pin(async move { MemoryIndex::upsert(self, document) })
	}

	fn delete<'a>(
		&'a self,
		entity_type: EntityType,
		id: Uuid,
		version: u64,
	) -> BoxFuture<'a, catalog_storage::Result<WriteOutcome>> {
		Box::pin(async move { MemoryIndex::delete(self, entity_type, id, version) })
	}

	fn query<'a>(
		&'a self,
		request: IndexQuery<'a>,
	) -> BoxFuture<'a, catalog_storage::Result<IndexPage>> {
		Box::pin(async move {
			MemoryIndex::query(
				self,
				request.entity_type,
				request.query,
				request.filters,
				request.sort,
				request.page,
				request.page_size,
			)
		})
	}
}

impl RecordProvider for MemoryRecords {
	fn fetch<'a>(
		&'a self,
		entity_type: EntityType,
		id: Uuid,
	) -> BoxFuture<'a, catalog_storage::Result<Option<SearchableRecord>>> {
		Box::pin(async move { self.get(entity_type, id) })
	}

	fn list_ids<'a>(
		&'a self,
		entity_type: EntityType,
	) -> BoxFuture<'a, catalog_storage::Result<Vec<Uuid>>> {
		Box::pin(async move { self.ids(entity_type) })
	}
}

impl AlertSink for TracingAlerts {
	fn index_write_failed(&self, alert: &IndexWriteAlert) {
		tracing::error!(
			entity_type = %alert.entity_type,
			id = %alert.id,
			action = alert.action.as_str(),
			version = alert.version,
			attempts = alert.attempts,
			error = %alert.message,
			"Index write failed after retries."
		);
	}
}
