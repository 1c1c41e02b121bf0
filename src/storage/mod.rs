pub mod local;
pub mod provider;

pub use local::*;
pub use provider::*;

use bytes::Bytes;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::UploadPolicy;

/// Opaque handle to a stored blob.
///
/// Only the blob manager creates these and only storage providers interpret
/// them, so no other code builds disk paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoragePath(String);

impl StoragePath {
    /// Rehydrate a handle read back from the metadata store
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of a successful blob write
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub storage_path: StoragePath,
    pub file_type: String,
    pub size_bytes: i64,
}

/// Validates, names, writes, streams and removes uploaded blobs
pub struct BlobManager {
    provider: Arc<dyn StorageProvider>,
    policy: UploadPolicy,
}

impl BlobManager {
    pub fn new(provider: Arc<dyn StorageProvider>, policy: UploadPolicy) -> Self {
        Self { provider, policy }
    }

    /// Blob manager over a local directory
    pub fn local(root: impl Into<PathBuf>, policy: UploadPolicy) -> Self {
        Self::new(Arc::new(LocalStorage::new(root)), policy)
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Check extension and declared size, returning the resolved file type
    pub fn validate_incoming(&self, original_name: &str, declared_size: u64) -> Result<String> {
        let file_type = self.policy.check_extension(original_name)?;
        self.policy.check_size(declared_size)?;
        Ok(file_type)
    }

    /// Write `data` under a freshly generated name
    pub async fn store(&self, data: Bytes, original_name: &str) -> Result<StoredBlob> {
        let file_type = self.validate_incoming(original_name, data.len() as u64)?;
        if data.is_empty() {
            return Err(AppError::validation("File is empty"));
        }

        let name = generate_blob_name(&file_type);
        self.provider.put(&name, data.clone()).await?;

        tracing::debug!(
            "Stored {:?} as {} via {} storage",
            original_name,
            name,
            self.provider.storage_type()
        );

        Ok(StoredBlob {
            storage_path: StoragePath(name),
            file_type,
            size_bytes: data.len() as i64,
        })
    }

    pub async fn open_for_read(&self, path: &StoragePath) -> Result<BlobReader> {
        self.provider.open(path.as_str()).await
    }

    pub async fn remove(&self, path: &StoragePath) -> Result<()> {
        self.provider.delete(path.as_str()).await
    }

    pub async fn exists(&self, path: &StoragePath) -> Result<bool> {
        self.provider.exists(path.as_str()).await
    }
}

/// Timestamp plus random suffix plus the original extension
fn generate_blob_name(file_type: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{:09}.{}", millis, suffix, file_type)
}
