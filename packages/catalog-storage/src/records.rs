use std::{collections::BTreeMap, sync::RwLock};

use uuid::Uuid;

use catalog_domain::{EntityType, SearchableRecord};

use crate::{Error, Result};

#[derive(Default)]
struct Inner {
	records: BTreeMap<(EntityType, Uuid), SearchableRecord>,
	floors: BTreeMap<(EntityType, Uuid), u64>,
}

/// Primary record store. Every successful `put` stamps the next revision on the record so index
/// writes derived from it carry a monotonic version.
///
/// Removing a record keeps a revision floor for its id. A hard delete is indexed one revision past
/// the removed record, so a record re-created under the same id is stamped above that tombstone.
#[derive(Default)]
pub struct MemoryRecords {
	inner: RwLock<Inner>,
}
impl MemoryRecords {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the previous state and the stored state.
	pub fn put(
		&self,
		mut record: SearchableRecord,
	) -> Result<(Option<SearchableRecord>, SearchableRecord)> {
		let mut inner = self.inner.write().map_err(|_| Error::poisoned("Record"))?;
		let key = (record.entity_type, record.id);
		let previous = inner.records.get(&key).cloned();
		let floor = match previous.as_ref() {
			Some(previous) => previous.revision,
			None => inner.floors.remove(&key).unwrap_or_default(),
		};

		record.revision = floor.saturating_add(1).max(record.revision);

		inner.records.insert(key, record.clone());

		Ok((previous, record))
	}

	pub fn remove(&self, entity_type: EntityType, id: Uuid) -> Result<Option<SearchableRecord>> {
		let mut inner = self.inner.write().map_err(|_| Error::poisoned("Record"))?;
		let key = (entity_type, id);
		let removed = inner.records.remove(&key);

		if let Some(removed) = removed.as_ref() {
			inner.floors.insert(key, removed.revision.saturating_add(1));
		}

		Ok(removed)
	}

	pub fn get(&self, entity_type: EntityType, id: Uuid) -> Result<Option<SearchableRecord>> {
		let inner = self.inner.read().map_err(|_| Error::poisoned("Record"))?;

		Ok(inner.records.get(&(entity_type, id)).cloned())
	}

	pub fn ids(&self, entity_type: EntityType) -> Result<Vec<Uuid>> {
		let inner = self.inner.read().map_err(|_| Error::poisoned("Record"))?;

		Ok(inner
			.records
			.keys()
			.filter(|(entity, _)| *entity == entity_type)
			.map(|(_, id)| *id)
			.collect())
	}
}
