use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use catalog_domain::{EntityType, IndexDocument, SearchableRecord};
use catalog_storage::WriteOutcome;

use crate::{
	SearchService,
	retry::{self, RetryError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReindexAction {
	Upsert,
	Delete,
	Noop,
}
impl ReindexAction {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Upsert => "upsert",
			Self::Delete => "delete",
			Self::Noop => "noop",
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReindexOutcome {
	Noop,
	Applied { action: ReindexAction, version: u64 },
	/// The index already held a newer version.
	Stale { action: ReindexAction, version: u64 },
	/// Reported to the alert sink; the index may lag the record until the next change or rebuild.
	Failed { action: ReindexAction, attempts: u32, message: String },
}
impl ReindexOutcome {
	pub fn action(&self) -> ReindexAction {
		match self {
			Self::Noop => ReindexAction::Noop,
			Self::Applied { action, .. }
			| Self::Stale { action, .. }
			| Self::Failed { action, .. } => *action,
		}
	}
}

#[derive(Clone, Debug)]
pub struct IndexWriteAlert {
	pub entity_type: EntityType,
	pub id: Uuid,
	pub action: ReindexAction,
	pub version: u64,
	pub attempts: u32,
	pub message: String,
}

/// Transition table over the indexability of a record before and after a mutation.
pub fn decide(before_indexable: bool, after_indexable: bool) -> ReindexAction {
	match (before_indexable, after_indexable) {
		(_, true) => ReindexAction::Upsert,
		(true, false) => ReindexAction::Delete,
		(false, false) => ReindexAction::Noop,
	}
}

impl SearchService {
	/// Applies at most one index write for a record mutation. `None` stands for a record that did
	/// not exist before or no longer exists after. Write failures are retried, then reported to
	/// the alert sink; they never surface to the caller.
	pub async fn on_change(
		&self,
		before: Option<&SearchableRecord>,
		after: Option<&SearchableRecord>,
	) -> ReindexOutcome {
		let Some(subject) = after.or(before) else {
			return ReindexOutcome::Noop;
		};

		match (decide(self.is_indexable(before), self.is_indexable(after)), after) {
			(ReindexAction::Upsert, Some(after)) => self.upsert_record(after).await,
			(ReindexAction::Delete, Some(after)) =>
				self.delete_record(after.entity_type, after.id, after.revision).await,
			// A hard delete has no revision of its own; it supersedes the last known one.
			(ReindexAction::Delete, None) => {
				let version = subject.revision.saturating_add(1);

				self.delete_record(subject.entity_type, subject.id, version).await
			},
			_ => {
				tracing::debug!(
					entity_type = %subject.entity_type,
					id = %subject.id,
					"Reindex skipped."
				);

				ReindexOutcome::Noop
			},
		}
	}

	pub(crate) async fn upsert_record(&self, record: &SearchableRecord) -> ReindexOutcome {
		let document = IndexDocument::project(record);
		let version = document.version;
		let result = retry::run(&self.cfg.reindex.retry, self.write_timeout(), "upsert", || {
			self.index.upsert(document.clone())
		})
		.await;

		self.finish(record.entity_type, record.id, ReindexAction::Upsert, version, result)
	}

	pub(crate) async fn delete_record(
		&self,
		entity_type: EntityType,
		id: Uuid,
		version: u64,
	) -> ReindexOutcome {
		let result = retry::run(&self.cfg.reindex.retry, self.write_timeout(), "delete", || {
			self.index.delete(entity_type, id, version)
		})
		.await;

		self.finish(entity_type, id, ReindexAction::Delete, version, result)
	}

	fn write_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.search.timeout_ms)
	}

	fn finish(
		&self,
		entity_type: EntityType,
		id: Uuid,
		action: ReindexAction,
		version: u64,
		result: Result<WriteOutcome, RetryError>,
	) -> ReindexOutcome {
		match result {
			Ok(WriteOutcome::Applied) => {
				tracing::debug!(
					entity_type = %entity_type,
					id = %id,
					action = action.as_str(),
					version,
					"Reindex applied."
				);

				ReindexOutcome::Applied { action, version }
			},
			Ok(WriteOutcome::Stale) => {
				tracing::debug!(
					entity_type = %entity_type,
					id = %id,
					action = action.as_str(),
					version,
					"Reindex ignored a stale version."
				);

				ReindexOutcome::Stale { action, version }
			},
			Ok(WriteOutcome::Absent) => {
				tracing::debug!(
					entity_type = %entity_type,
					id = %id,
					version,
					"Reindex found no document to remove."
				);

				ReindexOutcome::Noop
			},
			Err(err) => {
				let (attempts, message) = match err {
					RetryError::Rejected(message) => (1, message),
					RetryError::Exhausted { attempts, message } => (attempts, message),
				};

				self.alerts.index_write_failed(&IndexWriteAlert {
					entity_type,
					id,
					action,
					version,
					attempts,
					message: message.clone(),
				});

				ReindexOutcome::Failed { action, attempts, message }
			},
		}
	}
}
