use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use bytes::BytesMut;
use tokio_util::io::ReaderStream;

use crate::error::{ApiResponse, AppError, Result};
use crate::models::{FilePage, FileQuery, FileRecord, ListFilesParams, Session};
use crate::services::{AccessKind, IncomingFile, UploadFields};
use crate::storage::BlobReader;
use crate::AppState;

/// List files with filters and pagination
/// GET /api/files?subject&grade&semester&search&page&pageSize
pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<ListFilesParams>,
) -> Result<Json<FilePage>> {
    let query = FileQuery::from(params);
    let page = state.catalog.query_files(&query).await?;
    Ok(Json(page))
}

/// Upload a file
/// POST /api/files
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<FileRecord>)> {
    // Reject before reading any of the body
    if !session.is_admin {
        return Err(AppError::Unauthorized);
    }
    let mut multipart =
        multipart.map_err(|e| AppError::validation(format!("Invalid upload form: {}", e)))?;

    let policy = state.catalog.blobs().policy();
    let mut fields = UploadFields::default();
    let mut file: Option<IncomingFile> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        AppError::validation(format!("Failed to process multipart: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let original_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| AppError::validation("No file uploaded"))?;

                // Fast feedback; the catalog validates again before storing
                policy.check_extension(&original_name)?;

                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    AppError::validation(format!("Failed to read file: {}", e))
                })? {
                    policy.check_size((data.len() + chunk.len()) as u64)?;
                    data.extend_from_slice(&chunk);
                }

                file = Some(IncomingFile {
                    original_name,
                    data: data.freeze(),
                });
            }
            "title" | "description" | "subject" | "grade" | "semester" => {
                let text = field.text().await.map_err(|e| {
                    AppError::validation(format!("Failed to read field {}: {}", name, e))
                })?;
                let slot = match name.as_str() {
                    "title" => &mut fields.title,
                    "description" => &mut fields.description,
                    "subject" => &mut fields.subject,
                    "grade" => &mut fields.grade,
                    _ => &mut fields.semester,
                };
                *slot = Some(text);
            }
            _ => {}
        }
    }

    let record = state
        .catalog
        .upload_file(fields, file, session.is_admin)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Delete a file and its blob
/// DELETE /api/files/:id
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse>> {
    state.catalog.delete_file(id, session.is_admin).await?;
    Ok(Json(ApiResponse::success_message("File deleted successfully")))
}

/// Download a file
/// GET /api/files/:id/download
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let (file, blob) = state.catalog.open_file(id, AccessKind::Download).await?;
    stream_response(&file, blob, "attachment")
}

/// View a file inline (PDF only, other types fall back to attachment)
/// GET /api/files/:id/view
pub async fn view_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let (file, blob) = state.catalog.open_file(id, AccessKind::View).await?;
    let disposition = if file.file_type == "pdf" {
        "inline"
    } else {
        "attachment"
    };
    stream_response(&file, blob, disposition)
}

/// Count an access without a transfer
/// POST /api/files/:id/download-count
pub async fn increment_download_count(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse>> {
    state.catalog.record_access(id, AccessKind::View).await?;
    Ok(Json(ApiResponse::success_message("Download count updated")))
}

fn stream_response(file: &FileRecord, blob: BlobReader, disposition: &str) -> Result<Response> {
    let content_type = mime_guess::from_ext(&file.file_type).first_or_octet_stream();

    // A client that hangs up mid-transfer just ends the stream
    let body = Body::from_stream(ReaderStream::new(blob.reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, blob.size)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, &file.filename),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// ASCII fallback name plus the RFC 5987 encoded original
fn content_disposition(disposition: &str, filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition,
        fallback,
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        body_json, body_bytes, login_cookie, multipart_request, test_app, TestApp,
    };
    use axum::http::Request;
    use tower::ServiceExt;

    const PDF: &[u8] = b"%PDF-1.4 sample";

    fn form(title: &str) -> Vec<(&'static str, String)> {
        vec![
            ("title", title.to_string()),
            ("description", "Unit review".to_string()),
            ("subject", "chemistry".to_string()),
            ("grade", "12".to_string()),
            ("semester", "1".to_string()),
        ]
    }

    async fn upload(app: &TestApp, cookie: Option<&str>, title: &str, name: &str, data: &[u8]) -> Response {
        let request = multipart_request("/api/files", cookie, &form(title), Some((name, data)));
        app.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(app: &TestApp, uri: &str) -> Response {
        app.router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("attachment", "week 1.pdf"),
            "attachment; filename=\"week 1.pdf\"; filename*=UTF-8''week%201.pdf"
        );
        let header = content_disposition("inline", "درس.pdf");
        assert!(header.starts_with("inline; filename=\"___.pdf\""));
        assert!(header.contains("filename*=UTF-8''%D8%AF"));
    }

    #[tokio::test]
    async fn test_upload_requires_admin() {
        let app = test_app();
        let response = upload(&app, None, "Acids", "acids.pdf", PDF).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["message"], "Unauthorized");
        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_list_download_flow() {
        let app = test_app();
        let cookie = login_cookie(&app).await;

        let response = upload(&app, Some(cookie.as_str()), "Acids", "Acids.PDF", PDF).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["fileType"], "pdf");
        assert_eq!(created["fileSize"], PDF.len());
        assert!(created.get("storagePath").is_none());

        let listed = body_json(get(&app, "/api/files?subject=chemistry&grade=12").await).await;
        assert_eq!(listed["files"][0]["id"], id);
        assert_eq!(listed["files"][0]["downloadCount"], 0);
        assert_eq!(listed["pagination"]["totalItems"], 1);
        assert_eq!(listed["pagination"]["pageSize"], 6);

        let response = get(&app, &format!("/api/files/{id}/download")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment; filename=\"Acids.PDF\""));
        assert_eq!(body_bytes(response).await, PDF);

        let listed = body_json(get(&app, "/api/files").await).await;
        assert_eq!(listed["files"][0]["downloadCount"], 1);
    }

    #[tokio::test]
    async fn test_view_disposition_by_type() {
        let app = test_app();
        let cookie = login_cookie(&app).await;

        let pdf = body_json(upload(&app, Some(cookie.as_str()), "A", "a.pdf", PDF).await).await;
        let docx = body_json(upload(&app, Some(cookie.as_str()), "B", "b.docx", b"PK docx").await).await;

        let response = get(&app, &format!("/api/files/{}/view", pdf["id"])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("inline;"));

        let response = get(&app, &format!("/api/files/{}/view", docx["id"])).await;
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment;"));
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    }

    #[tokio::test]
    async fn test_upload_rejections_leave_no_blob() {
        let app = test_app();
        let cookie = login_cookie(&app).await;

        let response = upload(&app, Some(cookie.as_str()), "A", "a.exe", PDF).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let big = vec![7u8; app.max_file_size as usize + 1];
        let response = upload(&app, Some(cookie.as_str()), "A", "a.pdf", &big).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = upload(&app, Some(cookie.as_str()), "", "a.pdf", PDF).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut bad_subject = form("A");
        bad_subject[2].1 = "history".into();
        let request =
            multipart_request("/api/files", Some(cookie.as_str()), &bad_subject, Some(("a.pdf", PDF)));
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = multipart_request("/api/files", Some(cookie.as_str()), &form("A"), None);
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(app.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let app = test_app();
        let cookie = login_cookie(&app).await;
        let created = body_json(upload(&app, Some(cookie.as_str()), "A", "a.pdf", PDF).await).await;
        let uri = format!("/api/files/{}", created["id"]);

        let anonymous = Request::delete(&uri).body(Body::empty()).unwrap();
        let response = app.router.clone().oneshot(anonymous).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let delete = || {
            Request::delete(&uri)
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap()
        };
        let response = app.router.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.blob_count(), 0);

        let response = app.router.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = get(&app, &format!("{uri}/download")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_count_endpoint() {
        let app = test_app();
        let cookie = login_cookie(&app).await;
        let created = body_json(upload(&app, Some(cookie.as_str()), "A", "a.pdf", PDF).await).await;

        let request = Request::post(format!("/api/files/{}/download-count", created["id"]))
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::post("/api/files/4242/download-count")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let listed = body_json(get(&app, "/api/files").await).await;
        assert_eq!(listed["files"][0]["downloadCount"], 1);
    }

    #[tokio::test]
    async fn test_list_defaults_and_clamping() {
        let app = test_app();
        let cookie = login_cookie(&app).await;
        for i in 0..7 {
            upload(&app, Some(cookie.as_str()), &format!("Sheet {i}"), "s.xlsx", b"PK xlsx").await;
        }

        let listed = body_json(get(&app, "/api/files?page=9&pageSize=junk&search=SHEET").await).await;
        assert_eq!(listed["pagination"]["currentPage"], 2);
        assert_eq!(listed["pagination"]["totalPages"], 2);
        assert_eq!(listed["files"].as_array().unwrap().len(), 1);
        assert_eq!(listed["files"][0]["title"], "Sheet 0");

        let listed = body_json(get(&app, "/api/files?page=99999999999").await).await;
        assert_eq!(listed["pagination"]["currentPage"], 2);
        assert_eq!(listed["files"][0]["title"], "Sheet 0");

        let listed = body_json(get(&app, "/api/files?semester=2").await).await;
        assert_eq!(listed["pagination"]["totalItems"], 0);
        assert_eq!(listed["pagination"]["totalPages"], 1);
    }
}
