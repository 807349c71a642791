use serde::{Deserialize, Serialize};
use uuid::Uuid;

use catalog_domain::EntityType;

use crate::{Error, ReindexAction, ReindexOutcome, Result, SearchService};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
	pub scanned_count: u64,
	pub indexed_count: u64,
	pub removed_count: u64,
	pub skipped_count: u64,
	pub error_count: u64,
}

impl SearchService {
	/// Re-evaluates every record of `entity_type` against the index. Safe under live traffic since
	/// every write is versioned by the record revision.
	pub async fn rebuild_index(&self, entity_type: EntityType) -> Result<RebuildReport> {
		let ids = self
			.records
			.list_ids(entity_type)
			.await
			.map_err(|err| Error::Storage { message: err.to_string() })?;
		let mut report = RebuildReport::default();

		for id in ids {
			report.scanned_count += 1;

			let record = match self.records.fetch(entity_type, id).await {
				Ok(Some(record)) => record,
				Ok(None) => {
					report.skipped_count += 1;

					continue;
				},
				Err(err) => {
					tracing::warn!(
						entity_type = %entity_type,
						id = %id,
						error = %err,
						"Failed to fetch record for rebuild."
					);

					report.error_count += 1;

					continue;
				},
			};
			let outcome = if self.is_indexable(Some(&record)) {
				self.upsert_record(&record).await
			} else {
				self.delete_record(entity_type, id, record.revision).await
			};

			match outcome {
				ReindexOutcome::Applied { action: ReindexAction::Upsert, .. } =>
					report.indexed_count += 1,
				ReindexOutcome::Applied { .. } => report.removed_count += 1,
				ReindexOutcome::Noop | ReindexOutcome::Stale { .. } => report.skipped_count += 1,
				ReindexOutcome::Failed { .. } => report.error_count += 1,
			}
		}

		tracing::info!(
			entity_type = %entity_type,
			scanned = report.scanned_count,
			indexed = report.indexed_count,
			removed = report.removed_count,
			errors = report.error_count,
			"Index rebuild finished."
		);

		Ok(report)
	}

	/// Re-applies the current state of one record, typically after an `IndexWriteAlert`. Unlike
	/// `on_change`, an exhausted write is returned as `Error::IndexWriteFailed`.
	pub async fn reindex_record(
		&self,
		entity_type: EntityType,
		id: Uuid,
	) -> Result<ReindexOutcome> {
		let record = self
			.records
			.fetch(entity_type, id)
			.await
			.map_err(|err| Error::Storage { message: err.to_string() })?
			.ok_or_else(|| Error::NotFound { message: format!("No {entity_type} with id {id}.") })?;
		let outcome = if self.is_indexable(Some(&record)) {
			self.upsert_record(&record).await
		} else {
			self.delete_record(entity_type, id, record.revision).await
		};

		match outcome {
			ReindexOutcome::Failed { action, attempts, message } => Err(Error::IndexWriteFailed {
				message: format!(
					"{} of {entity_type} {id} failed after {attempts} attempts: {message}",
					action.as_str()
				),
			}),
			outcome => Ok(outcome),
		}
	}
}
