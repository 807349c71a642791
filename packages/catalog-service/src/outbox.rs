use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use catalog_domain::SearchableRecord;

use crate::{ReindexOutcome, SearchService};

/// A record mutation awaiting reindex.
#[derive(Clone, Debug)]
pub struct ReindexJob {
	pub before: Option<SearchableRecord>,
	pub after: Option<SearchableRecord>,
}

/// Defers `on_change` to a single worker task. The channel is FIFO with one consumer, so changes
/// to a record are applied in submission order.
#[derive(Clone)]
pub struct ReindexQueue {
	tx: mpsc::Sender<ReindexJob>,
	service: Arc<SearchService>,
}
impl ReindexQueue {
	/// Returns the queue handle and the worker task, which ends once every handle is dropped and
	/// yields the number of jobs it processed.
	pub fn spawn(service: Arc<SearchService>) -> (Self, JoinHandle<u64>) {
		let (tx, rx) = mpsc::channel(service.cfg.reindex.queue_capacity.max(1));
		let worker = tokio::spawn(run_worker(Arc::clone(&service), rx));

		(Self { tx, service }, worker)
	}

	/// Waits for queue capacity. Falls back to reindexing inline when the worker is gone.
	pub async fn submit(
		&self,
		before: Option<SearchableRecord>,
		after: Option<SearchableRecord>,
	) -> Option<ReindexOutcome> {
		match self.tx.send(ReindexJob { before, after }).await {
			Ok(()) => None,
			Err(mpsc::error::SendError(job)) => {
				tracing::warn!("Reindex worker is not running. Reindexing inline.");

				Some(self.service.on_change(job.before.as_ref(), job.after.as_ref()).await)
			},
		}
	}
}

async fn run_worker(service: Arc<SearchService>, mut rx: mpsc::Receiver<ReindexJob>) -> u64 {
	let mut processed = 0_u64;

	tracing::info!("Reindex worker started.");

	while let Some(job) = rx.recv().await {
		service.on_change(job.before.as_ref(), job.after.as_ref()).await;

		processed += 1;
	}

	tracing::info!(processed, "Reindex worker stopped.");

	processed
}
