use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Category, FileRecord, Grade, NewFileRecord, Semester, Subject, UploadPolicy};
use crate::storage::StoragePath;
use crate::store::{CatalogSnapshot, MetadataStore};

/// Row shape of the `files` table
#[derive(Debug, FromRow)]
struct FileRow {
    id: i64,
    title: String,
    description: String,
    subject: String,
    grade: String,
    semester: String,
    filename: String,
    storage_path: String,
    file_type: String,
    file_size: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FileRow {
    fn into_record(self) -> Result<FileRecord> {
        let corrupt = |e: AppError| AppError::Internal(format!("Corrupt file record {}: {}", self.id, e));
        Ok(FileRecord {
            id: self.id,
            subject: Subject::parse(&self.subject).map_err(corrupt)?,
            grade: Grade::parse(&self.grade).map_err(corrupt)?,
            semester: Semester::parse(&self.semester).map_err(corrupt)?,
            title: self.title,
            description: self.description,
            filename: self.filename,
            storage_path: StoragePath::from_stored(self.storage_path),
            file_type: self.file_type,
            file_size: self.file_size,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SQLite backed metadata store
pub struct SqliteMetadataStore {
    db: Database,
    policy: UploadPolicy,
}

impl SqliteMetadataStore {
    pub fn new(db: Database, policy: UploadPolicy) -> Self {
        Self { db, policy }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create_file(&self, file: NewFileRecord) -> Result<FileRecord> {
        file.validate(&self.policy)?;

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO files (title, description, subject, grade, semester, filename, storage_path, file_type, file_size, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&file.title)
        .bind(&file.description)
        .bind(file.subject.as_str())
        .bind(file.grade.as_str())
        .bind(file.semester.as_str())
        .bind(&file.filename)
        .bind(file.storage_path.as_str())
        .bind(&file.file_type)
        .bind(file.file_size)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO download_counts (file_id, count) VALUES (?, 0)")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(FileRecord {
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
        })
    }

    async fn get_file(&self, id: i64) -> Result<Option<FileRecord>> {
        let row: Option<FileRow> = sqlx::query_as("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(FileRow::into_record).transpose()
    }

    async fn delete_file(&self, id: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;

        sqlx::query("DELETE FROM download_counts WHERE file_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::not_found("File not found"));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn increment_download_count(&self, file_id: i64) -> Result<i64> {
        // Single statement upsert; the SELECT yields no row for an unknown file
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO download_counts (file_id, count)
            SELECT id, 1 FROM files WHERE id = ?
            ON CONFLICT(file_id) DO UPDATE SET count = count + 1
            RETURNING count
            "#,
        )
        .bind(file_id)
        .fetch_optional(self.db.pool())
        .await?;

        count.ok_or_else(|| AppError::not_found("File not found"))
    }

    async fn download_count(&self, file_id: i64) -> Result<i64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT count FROM download_counts WHERE file_id = ?")
                .bind(file_id)
                .fetch_optional(self.db.pool())
                .await?;

        Ok(count.unwrap_or(0))
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let rows: Vec<FileRow> = sqlx::query_as("SELECT * FROM files")
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(FileRow::into_record).collect()
    }

    async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let mut tx = self.db.pool().begin().await?;

        let rows: Vec<FileRow> = sqlx::query_as("SELECT * FROM files")
            .fetch_all(&mut *tx)
            .await?;
        let counts: Vec<(i64, i64)> = sqlx::query_as("SELECT file_id, count FROM download_counts")
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CatalogSnapshot {
            files: rows
                .into_iter()
                .map(FileRow::into_record)
                .collect::<Result<Vec<_>>>()?,
            download_counts: counts.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::tests::{new_file, policy};
    use std::sync::Arc;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteMetadataStore {
        let path = dir.path().join("catalog.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();
        SqliteMetadataStore::new(db, policy())
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let mut file = new_file("algebra");
        file.subject = Subject::Physics;
        file.grade = Grade::Twelfth;
        file.semester = Semester::Second;
        let created = store.create_file(file).await.unwrap();

        let loaded = store.get_file(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "algebra");
        assert_eq!(loaded.subject, Subject::Physics);
        assert_eq!(loaded.grade, Grade::Twelfth);
        assert_eq!(loaded.semester, Semester::Second);
        assert_eq!(loaded.storage_path, created.storage_path);
        assert_eq!(loaded.created_at, created.created_at);
        assert_eq!(store.download_count(created.id).await.unwrap(), 0);

        assert!(store.get_file(created.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let a = store.create_file(new_file("a")).await.unwrap();
        store.delete_file(a.id).await.unwrap();
        let b = store.create_file(new_file("b")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let a = store.create_file(new_file("a")).await.unwrap();
        let b = store.create_file(new_file("b")).await.unwrap();
        store.increment_download_count(a.id).await.unwrap();

        store.delete_file(a.id).await.unwrap();
        assert!(store.get_file(a.id).await.unwrap().is_none());
        assert_eq!(store.download_count(a.id).await.unwrap(), 0);

        let err = store.delete_file(a.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.files.len(), 1);
        assert_eq!(snapshot.files[0].id, b.id);
        assert_eq!(snapshot.download_counts.len(), 1);
    }

    #[tokio::test]
    async fn test_increment_heals_and_rejects_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;
        let a = store.create_file(new_file("a")).await.unwrap();

        sqlx::query("DELETE FROM download_counts")
            .execute(store.db.pool())
            .await
            .unwrap();
        assert_eq!(store.increment_download_count(a.id).await.unwrap(), 1);
        assert_eq!(store.increment_download_count(a.id).await.unwrap(), 2);

        let err = store.increment_download_count(a.id + 100).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(&dir).await);
        let id = store.create_file(new_file("a")).await.unwrap().id;

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_download_count(id).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.download_count(id).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir).await;

        let mut file = new_file("a");
        file.file_size = 0;
        assert!(matches!(store.create_file(file).await, Err(AppError::Validation(_))));
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
