//! Key-addressed storage behind the pipeline.
//!
//! Writes are whole-object replacements and `list` returns sorted paths, so
//! "latest" lookups are deterministic. The backend is chosen once at startup
//! from [`StorageConfig`] and injected; library code never sniffs the
//! environment.

pub mod local;
pub mod sqlite;

use crate::error::StorageError;
use std::path::PathBuf;

pub use local::LocalStorage;
pub use sqlite::SqliteStorage;

/// Path conventions under the storage root.
pub fn raw_path(source_id: &str, date: chrono::NaiveDate) -> String {
    format!("raw/{source_id}/{date}.json")
}

pub fn observations_path(date: chrono::NaiveDate) -> String {
    format!("observations/{date}.jsonl")
}

pub fn index_path(date: chrono::NaiveDate) -> String {
    format!("indices/{date}.json")
}

/// Key-addressed read/write surface the pipeline writes through.
pub trait StorageBackend: Send + Sync {
    /// Read content at `path`; `Ok(None)` when absent.
    fn read(&self, path: &str) -> Result<Option<String>, StorageError>;

    /// Replace the whole object at `path`. Readers must never observe a
    /// half-written result.
    fn write(&self, path: &str, content: &str) -> Result<(), StorageError>;

    fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Paths under `prefix`, optionally filtered by `suffix`, in ascending
    /// lexicographic order.
    fn list(&self, prefix: &str, suffix: Option<&str>) -> Result<Vec<String>, StorageError>;
}

/// Which concrete backend to construct. Resolved once by the caller.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Filesystem { base_dir: PathBuf },
    Sqlite { db_path: PathBuf },
}

impl StorageConfig {
    pub fn build(&self) -> Result<Box<dyn StorageBackend>, StorageError> {
        match self {
            StorageConfig::Filesystem { base_dir } => {
                Ok(Box::new(LocalStorage::new(base_dir.clone())))
            }
            StorageConfig::Sqlite { db_path } => Ok(Box::new(SqliteStorage::open(db_path)?)),
        }
    }
}

/// Most recent date-named file under `prefix`, by descending filename.
pub fn latest_dated_file(
    storage: &dyn StorageBackend,
    prefix: &str,
    suffix: &str,
) -> Result<Option<String>, StorageError> {
    let mut files = storage.list(prefix, Some(suffix))?;
    files.sort();
    Ok(files.pop())
}
