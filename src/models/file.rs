use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Grade, Semester, Subject};
use crate::storage::StoragePath;

/// Stored document metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub subject: Subject,
    pub grade: Grade,
    pub semester: Semester,
    /// Original name supplied by the uploader
    pub filename: String,
    #[serde(skip)]
    pub storage_path: StoragePath,
    /// Lowercase extension without the dot
    pub file_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a record that does not exist yet
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub title: String,
    pub description: String,
    pub subject: Subject,
    pub grade: Grade,
    pub semester: Semester,
    pub filename: String,
    pub storage_path: StoragePath,
    pub file_type: String,
    pub file_size: i64,
}

impl NewFileRecord {
    /// Final check before a record is persisted
    pub fn validate(&self, policy: &UploadPolicy) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if self.filename.trim().is_empty() {
            return Err(AppError::validation("File name is required"));
        }
        if self.file_size <= 0 {
            return Err(AppError::validation("File is empty"));
        }
        policy.check_size(self.file_size as u64)?;
        if !policy.is_allowed(&self.file_type) {
            return Err(AppError::validation(format!(
                "File type {:?} is not allowed",
                self.file_type
            )));
        }
        Ok(())
    }
}

/// Accepted extensions and size ceiling for uploads
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    allowed_extensions: Vec<String>,
    max_file_size: u64,
}

impl UploadPolicy {
    pub fn new<I, S>(allowed_extensions: I, max_file_size: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            max_file_size,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    pub fn is_allowed(&self, file_type: &str) -> bool {
        self.allowed_extensions.iter().any(|e| e == file_type)
    }

    /// Resolve the lowercase extension of `name` and check it is accepted
    pub fn check_extension(&self, name: &str) -> Result<String> {
        let ext = file_extension(name).unwrap_or_default();
        if ext.is_empty() || !self.is_allowed(&ext) {
            let accepted: Vec<String> = self
                .allowed_extensions
                .iter()
                .map(|e| e.to_uppercase())
                .collect();
            return Err(AppError::validation(format!(
                "Invalid file type. Only {} files are allowed.",
                accepted.join(", ")
            )));
        }
        Ok(ext)
    }

    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(AppError::validation(format!(
                "File too large. Maximum size is {} bytes.",
                self.max_file_size
            )));
        }
        Ok(())
    }
}

/// Lowercase extension from the trailing dot-segment of a file name
pub fn file_extension(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// File record joined with its current download count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWithCount {
    #[serde(flatten)]
    pub file: FileRecord,
    pub download_count: i64,
    pub upload_date: DateTime<Utc>,
}

impl FileWithCount {
    pub fn new(file: FileRecord, download_count: i64) -> Self {
        let upload_date = file.created_at;
        Self {
            file,
            download_count,
            upload_date,
        }
    }
}

/// Filter and pagination request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub semester: Option<String>,
    pub search: Option<String>,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 100;

impl Default for FileQuery {
    fn default() -> Self {
        Self {
            subject: None,
            grade: None,
            semester: None,
            search: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Raw query string for GET /files, parsed leniently
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesParams {
    pub subject: Option<String>,
    pub grade: Option<String>,
    pub semester: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl From<ListFilesParams> for FileQuery {
    fn from(params: ListFilesParams) -> Self {
        fn non_empty(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        // Search text is matched as given; only blank input means no search
        fn not_blank(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }
        // Leading digits count ("3abc" is 3); values past u32 saturate so the
        // page still clamps to the last one
        fn positive(v: Option<String>, default: u32) -> u32 {
            let Some(raw) = v else {
                return default;
            };
            let raw = raw.trim_start();
            let end = raw
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(raw.len());
            let digits = &raw[..end];
            if digits.is_empty() {
                return default;
            }
            let n = digits
                .parse::<u64>()
                .map_or(u32::MAX, |n| u32::try_from(n).unwrap_or(u32::MAX));
            if n == 0 {
                default
            } else {
                n
            }
        }

        Self {
            subject: non_empty(params.subject),
            grade: non_empty(params.grade),
            semester: non_empty(params.semester),
            search: not_blank(params.search),
            page: positive(params.page, 1),
            page_size: positive(params.page_size, DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
        }
    }
}

/// Pagination descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub total_items: u64,
}

/// One page of query results
#[derive(Debug, Clone, Serialize)]
pub struct FilePage {
    pub files: Vec<FileWithCount>,
    pub pagination: Pagination,
}
