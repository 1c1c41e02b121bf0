use bytes::Bytes;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{
    Category, CategoryEntry, CategoryKind, FilePage, FileQuery, FileRecord, Grade, NewFileRecord,
    Semester, Subject,
};
use crate::services::query;
use crate::storage::{BlobManager, BlobReader, StoredBlob};
use crate::store::MetadataStore;

/// Form fields accompanying an upload, as received
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub semester: Option<String>,
}

/// The uploaded payload
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub data: Bytes,
}

/// Why a file is being read. Both count as an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Download,
    View,
}

/// Single entry point over the metadata store, the query engine and blobs
pub struct CatalogService {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<BlobManager>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn MetadataStore>, blobs: Arc<BlobManager>) -> Self {
        Self { store, blobs }
    }

    pub fn blobs(&self) -> &BlobManager {
        &self.blobs
    }

    pub async fn query_files(&self, query: &FileQuery) -> Result<FilePage> {
        let snapshot = self.store.snapshot().await?;
        Ok(query::run(snapshot, query))
    }

    pub async fn get_file(&self, id: i64) -> Result<FileRecord> {
        self.store
            .get_file(id)
            .await?
            .ok_or_else(|| AppError::not_found("File not found"))
    }

    pub fn categories(&self, kind: CategoryKind) -> Vec<CategoryEntry> {
        self.store.categories(kind)
    }

    /// Validate, write the blob, then persist the record. A blob written for
    /// an upload that fails afterwards is removed before the error returns.
    pub async fn upload_file(
        &self,
        fields: UploadFields,
        file: Option<IncomingFile>,
        requester_is_admin: bool,
    ) -> Result<FileRecord> {
        if !requester_is_admin {
            return Err(AppError::Unauthorized);
        }

        let file = file.ok_or_else(|| AppError::validation("No file uploaded"))?;
        required(&fields.title, "title")?;
        required(&fields.subject, "subject")?;
        required(&fields.grade, "grade")?;
        required(&fields.semester, "semester")?;

        self.blobs
            .validate_incoming(&file.original_name, file.data.len() as u64)?;
        let stored = self.blobs.store(file.data, &file.original_name).await?;

        match self.create_record(fields, &file.original_name, &stored).await {
            Ok(record) => {
                tracing::info!(
                    "Uploaded file {} ({:?}, {} bytes)",
                    record.id,
                    record.filename,
                    record.file_size
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.remove(&stored.storage_path).await {
                    tracing::warn!(
                        "Failed to remove blob {} after rejected upload: {}",
                        stored.storage_path.as_str(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn create_record(
        &self,
        fields: UploadFields,
        original_name: &str,
        stored: &StoredBlob,
    ) -> Result<FileRecord> {
        let new_file = NewFileRecord {
            title: fields.title.unwrap_or_default().trim().to_string(),
            description: fields.description.unwrap_or_default().trim().to_string(),
            subject: Subject::parse(fields.subject.as_deref().unwrap_or_default())?,
            grade: Grade::parse(fields.grade.as_deref().unwrap_or_default())?,
            semester: Semester::parse(fields.semester.as_deref().unwrap_or_default())?,
            filename: display_file_name(original_name),
            storage_path: stored.storage_path.clone(),
            file_type: stored.file_type.clone(),
            file_size: stored.size_bytes,
        };

        self.store.create_file(new_file).await
    }

    /// Remove the blob first, then the record. If the second step never
    /// happens the record survives and points at a missing blob, which reads
    /// as a 404 instead of leaking an unreferenced blob.
    pub async fn delete_file(&self, id: i64, requester_is_admin: bool) -> Result<()> {
        if !requester_is_admin {
            return Err(AppError::Unauthorized);
        }

        let file = self.get_file(id).await?;
        self.blobs.remove(&file.storage_path).await?;
        self.store.delete_file(id).await?;

        tracing::info!("Deleted file {} ({:?})", id, file.filename);
        Ok(())
    }

    /// Count an access to an existing file, returning the new count
    pub async fn record_access(&self, id: i64, kind: AccessKind) -> Result<i64> {
        self.get_file(id).await?;
        let count = self.store.increment_download_count(id).await?;
        tracing::debug!("Recorded {:?} of file {} (count {})", kind, id, count);
        Ok(count)
    }

    /// Open a file's blob for transfer and count the access once the blob is
    /// known to be readable
    pub async fn open_file(&self, id: i64, kind: AccessKind) -> Result<(FileRecord, BlobReader)> {
        let file = self.get_file(id).await?;
        let blob = self.blobs.open_for_read(&file.storage_path).await?;
        self.store.increment_download_count(id).await?;
        tracing::debug!("Serving {:?} of file {}", kind, id);
        Ok((file, blob))
    }
}

fn required(value: &Option<String>, name: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(AppError::validation(format!("Missing required field: {}", name))),
    }
}

/// Last path segment of an uploader supplied name
fn display_file_name(original_name: &str) -> String {
    original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
        .trim()
        .to_string()
}
