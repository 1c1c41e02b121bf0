use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{FileRecord, NewFileRecord, UploadPolicy};
use crate::store::{CatalogSnapshot, MetadataStore};

#[derive(Default)]
struct Inner {
    files: BTreeMap<i64, FileRecord>,
    download_counts: HashMap<i64, i64>,
    last_id: i64,
}

/// In-process metadata store. Every mutation runs under the write lock.
pub struct MemoryMetadataStore {
    inner: RwLock<Inner>,
    policy: UploadPolicy,
}

impl MemoryMetadataStore {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            policy,
        }
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn create_file(&self, file: NewFileRecord) -> Result<FileRecord> {
        file.validate(&self.policy)?;

        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = inner.last_id;
        let now = Utc::now();

        let record = FileRecord {
            id,
            title: file.title,
            description: file.description,
            subject: file.subject,
            grade: file.grade,
            semester: file.semester,
            filename: file.filename,
            storage_path: file.storage_path,
            file_type: file.file_type,
            file_size: file.file_size,
            created_at: now,
            updated_at: now,
        };

        inner.files.insert(id, record.clone());
        inner.download_counts.insert(id, 0);
        Ok(record)
    }

    async fn get_file(&self, id: i64) -> Result<Option<FileRecord>> {
        Ok(self.inner.read().await.files.get(&id).cloned())
    }

    async fn delete_file(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.files.remove(&id).is_none() {
            return Err(AppError::not_found("File not found"));
        }
        inner.download_counts.remove(&id);
        Ok(())
    }

    async fn increment_download_count(&self, file_id: i64) -> Result<i64> {
        let mut inner = self.inner.write().await;
        if !inner.files.contains_key(&file_id) {
            return Err(AppError::not_found("File not found"));
        }
        let count = inner.download_counts.entry(file_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn download_count(&self, file_id: i64) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner.download_counts.get(&file_id).copied().unwrap_or(0))
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        Ok(self.inner.read().await.files.values().cloned().collect())
    }

    async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let inner = self.inner.read().await;
        Ok(CatalogSnapshot {
            files: inner.files.values().cloned().collect(),
            download_counts: inner.download_counts.clone(),
        })
    }
}
