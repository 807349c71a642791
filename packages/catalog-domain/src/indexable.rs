use std::{collections::BTreeMap, sync::Arc};

use crate::{
	EntityType, Filter, SearchableRecord,
	document::{FLAG_ARCHIVED, FLAG_DELETED, FLAG_PRIVATE},
};

/// Decides whether a record may ever appear in the index. `filters` must express the same rule
/// over indexed documents so query time and index time agree.
pub trait Indexability
where
	Self: Send + Sync,
{
	fn is_indexable(&self, record: &SearchableRecord) -> bool;

	fn filters(&self) -> Vec<Filter>;
}

pub type Strategies = BTreeMap<EntityType, Arc<dyn Indexability>>;

/// Lifecycle-driven predicate: soft-deleted records are always excluded, private and archived
/// records when the entity type supports those states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleIndexability {
	pub honor_private: bool,
	pub honor_archived: bool,
}
impl LifecycleIndexability {
	pub const FULL: Self = Self { honor_private: true, honor_archived: true };
	pub const DELETION_ONLY: Self = Self { honor_private: false, honor_archived: false };

	pub fn for_entity(entity_type: EntityType) -> Self {
		match entity_type {
			EntityType::Dataservice | EntityType::Dataset | EntityType::Reuse => Self::FULL,
			EntityType::Organization => Self::DELETION_ONLY,
		}
	}

	pub fn default_strategies() -> Strategies {
		EntityType::ALL
			.into_iter()
			.map(|entity_type| {
				let strategy: Arc<dyn Indexability> = Arc::new(Self::for_entity(entity_type));

				(entity_type, strategy)
			})
			.collect()
	}
}

impl Indexability for LifecycleIndexability {
	fn is_indexable(&self, record: &SearchableRecord) -> bool {
		if record.deleted_at.is_some() {
			return false;
		}
		if self.honor_archived && record.archived_at.is_some() {
			return false;
		}
		if self.honor_private && record.private {
			return false;
		}

		true
	}

	fn filters(&self) -> Vec<Filter> {
		let mut out = vec![Filter::flag(FLAG_DELETED, false)];

		if self.honor_archived {
			out.push(Filter::flag(FLAG_ARCHIVED, false));
		}
		if self.honor_private {
			out.push(Filter::flag(FLAG_PRIVATE, false));
		}

		out
	}
}
