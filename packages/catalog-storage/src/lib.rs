pub mod analysis;
pub mod fuzzy;
pub mod index;
pub mod records;

mod error;

pub use error::Error;
pub use index::{IndexHit, IndexPage, MemoryIndex, WriteOutcome};
pub use records::MemoryRecords;

pub type Result<T, E = Error> = std::result::Result<T, E>;
