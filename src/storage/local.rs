use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{BlobReader, StorageProvider};

/// Local file system storage provider, one flat directory of blobs
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Map a blob name to a path inside the root, rejecting anything that is
    /// not a single plain file name
    fn get_full_path(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.base_path.join(name)),
            _ => Err(AppError::StorageIo(format!("Invalid storage path: {:?}", name))),
        }
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(&self, name: &str, data: Bytes) -> Result<()> {
        let full_path = self.get_full_path(name)?;

        // Storage root is created lazily
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            AppError::StorageIo(format!("Failed to create storage root: {}", e))
        })?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full_path)
            .await
            .map_err(|e| AppError::StorageIo(format!("Failed to create blob: {}", e)))?;

        let written = async {
            file.write_all(&data).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&full_path).await {
                tracing::warn!("Failed to remove partial blob {:?}: {}", full_path, cleanup);
            }
            return Err(AppError::StorageIo(format!("Failed to write blob: {}", e)));
        }

        tracing::debug!("Saved blob to {:?} ({} bytes)", full_path, data.len());
        Ok(())
    }

    async fn open(&self, name: &str) -> Result<BlobReader> {
        let full_path = self.get_full_path(name)?;

        let file = fs::File::open(&full_path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::not_found("File not found on server")
            } else {
                AppError::StorageIo(format!("Failed to open blob: {}", e))
            }
        })?;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| AppError::StorageIo(format!("Failed to stat blob: {}", e)))?;

        Ok(BlobReader {
            size: metadata.len(),
            reader: Box::new(file),
        })
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let full_path = self.get_full_path(name)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => {
                tracing::debug!("Deleted blob {:?}", full_path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("Blob {:?} already gone", full_path);
                Ok(())
            }
            Err(e) => Err(AppError::StorageIo(format!("Failed to delete blob: {}", e))),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let full_path = self.get_full_path(name)?;
        fs::try_exists(&full_path)
            .await
            .map_err(|e| AppError::StorageIo(format!("Failed to stat blob: {}", e)))
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
