pub mod error;
pub mod memory;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStorage;

/// Host-style key-value storage holding opaque string records.
///
/// Writes are whole-record overwrites; there is no partial update and no
/// versioning. Last write wins.
///
/// Calls are synchronous and may block the calling thread until the backend
/// answers. `SqliteStorage` runs each call on its own thread and, inside a
/// multi-thread tokio runtime, marks the wait with `block_in_place`.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

pub(crate) fn ensure_key(key: &str, stage: &'static str) -> StorageResult<()> {
    snafu::ensure!(!key.trim().is_empty(), error::EmptyKeySnafu { stage });
    Ok(())
}
