pub mod memory;
pub mod sqlite;

pub use memory::MemoryMetadataStore;
pub use sqlite::SqliteMetadataStore;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{CategoryEntry, CategoryKind, FileRecord, NewFileRecord};

/// File records and download counters read together
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub files: Vec<FileRecord>,
    pub download_counts: HashMap<i64, i64>,
}

impl CatalogSnapshot {
    pub fn download_count(&self, file_id: i64) -> i64 {
        self.download_counts.get(&file_id).copied().unwrap_or(0)
    }
}

/// Owner of file records and their download counters
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a record with the next id and a zeroed counter
    async fn create_file(&self, file: NewFileRecord) -> Result<FileRecord>;

    async fn get_file(&self, id: i64) -> Result<Option<FileRecord>>;

    /// Remove a record and its counter. `AppError::NotFound` if absent.
    /// The blob is left alone.
    async fn delete_file(&self, id: i64) -> Result<()>;

    /// Bump the counter of an existing record, recreating a missing counter
    /// at 1. Returns the new count.
    async fn increment_download_count(&self, file_id: i64) -> Result<i64>;

    /// Current count, 0 when no counter exists
    async fn download_count(&self, file_id: i64) -> Result<i64>;

    /// Every record, in no particular order
    async fn list_all(&self) -> Result<Vec<FileRecord>>;

    /// Records and counters as of a single point in time
    async fn snapshot(&self) -> Result<CatalogSnapshot>;

    fn categories(&self, kind: CategoryKind) -> Vec<CategoryEntry> {
        kind.entries()
    }
}
