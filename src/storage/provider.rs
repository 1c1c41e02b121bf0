use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Readable blob content plus its length
pub struct BlobReader {
    pub size: u64,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl std::fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReader").field("size", &self.size).finish()
    }
}

/// Storage provider trait
///
/// `name` is always a flat, already generated blob name. Providers never
/// invent names themselves.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Write a new blob. Fails if `name` already exists.
    async fn put(&self, name: &str, data: Bytes) -> Result<()>;

    /// Open a blob for streaming. `AppError::NotFound` if absent.
    async fn open(&self, name: &str) -> Result<BlobReader>;

    /// Delete a blob. Deleting a missing blob is not an error.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Check if a blob exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}
