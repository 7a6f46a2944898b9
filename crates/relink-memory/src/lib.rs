//! relink-memory - In-memory repository for relink.
//!
//! Tables live behind a single lock, every write is journaled, and the
//! whole store can be loaded from and saved to a JSON snapshot file.

mod journal;
mod repository;
mod snapshot;

pub use journal::{WriteEvent, WriteOp};
pub use repository::MemoryRepository;
pub use snapshot::Snapshot;
