//! Router level helpers shared by the handler tests

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{AuthConfig, Config, DatabaseDriver};
use crate::models::UploadPolicy;
use crate::services::{CatalogService, SessionService};
use crate::storage::BlobManager;
use crate::store::MemoryMetadataStore;
use crate::{create_router, AppState};

pub const ADMIN_USERNAME: &str = "librarian";
pub const ADMIN_PASSWORD: &str = "correct horse";

const BOUNDARY: &str = "edushelf-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub max_file_size: u64,
    dir: TempDir,
}

impl TestApp {
    /// Number of blobs currently on disk
    pub fn blob_count(&self) -> usize {
        std::fs::read_dir(self.dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Router over an in-memory catalog and a temporary upload directory
pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let max_file_size = 64 * 1024;

    let mut config = Config::default();
    config.database.driver = DatabaseDriver::Memory;
    config.storage.local_path = dir.path().to_string_lossy().into_owned();
    config.storage.max_file_size = max_file_size;
    config.auth = AuthConfig {
        admin_username: ADMIN_USERNAME.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
        ..AuthConfig::default()
    };

    let policy = UploadPolicy::new(&config.storage.allowed_extensions, max_file_size);
    let store = Arc::new(MemoryMetadataStore::new(policy.clone()));
    let blobs = Arc::new(BlobManager::local(dir.path(), policy));

    let state = AppState {
        catalog: Arc::new(CatalogService::new(store, blobs)),
        sessions: Arc::new(SessionService::new(&config.auth)),
        config: Arc::new(config),
    };

    TestApp {
        router: create_router(state),
        max_file_size,
        dir,
    }
}

/// Log in and return the `name=value` pair for a Cookie header
pub async fn login_cookie(app: &TestApp) -> String {
    let body = serde_json::json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD });
    let request = Request::post("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

/// Build a multipart/form-data POST with text fields and an optional file part
pub fn multipart_request(
    uri: &str,
    cookie: Option<&str>,
    fields: &[(&str, String)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
