use std::sync::Arc;

use catalog_config::Config;
use catalog_domain::SearchableRecord;
use catalog_service::{IndexStore, RecordProvider, ReindexOutcome, ReindexQueue, SearchService};
use catalog_storage::{MemoryIndex, MemoryRecords};

pub const REINDEX_MODE_QUEUED: &str = "queued";

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SearchService>,
	pub records: Arc<MemoryRecords>,
	pub queue: Option<ReindexQueue>,
}
impl AppState {
	/// Spawns the reindex worker when `reindex.mode` is queued, so it must run inside a tokio
	/// runtime.
	pub fn new(config: Config) -> color_eyre::Result<Self> {
		let index: Arc<dyn IndexStore> = Arc::new(MemoryIndex::from_config(&config.search));
		let records = Arc::new(MemoryRecords::new());
		let queued = config.reindex.mode == REINDEX_MODE_QUEUED;
		let service = Arc::new(SearchService::new(
			config,
			index,
			Arc::clone(&records) as Arc<dyn RecordProvider>,
		)?);
		let queue = queued.then(|| ReindexQueue::spawn(Arc::clone(&service)).0);

		Ok(Self { service, records, queue })
	}

	/// `None` when the change was handed to the queue worker.
	pub async fn reindex(
		&self,
		before: Option<SearchableRecord>,
		after: Option<SearchableRecord>,
	) -> Option<ReindexOutcome> {
		match &self.queue {
			Some(queue) => queue.submit(before, after).await,
			None => Some(self.service.on_change(before.as_ref(), after.as_ref()).await),
		}
	}
}
