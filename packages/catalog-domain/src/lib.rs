pub mod document;
pub mod entity;
pub mod indexable;
pub mod query;
pub mod record;
pub mod score;

pub use document::{IndexDocument, SortValue};
pub use entity::EntityType;
pub use indexable::{Indexability, LifecycleIndexability, Strategies};
pub use query::{
	BoolQuery, BoostMode, FieldBoost, Filter, FunctionScoreQuery, Fuzziness, MatchQuery,
	MultiMatchKind, MultiMatchQuery, Operator, Query, ScoreMode, Sort, SortOrder,
};
pub use record::{OrganizationRef, SearchableRecord};
pub use score::{Modifier, ScoreFunctionRegistry, ScoreFunctionSpec};
