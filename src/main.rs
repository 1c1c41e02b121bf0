mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod storage;
mod store;
#[cfg(test)]
mod test_support;

use handlers::{auth, category, file};
use middleware::session::session_middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DatabaseDriver};
use crate::db::Database;
use crate::models::UploadPolicy;
use crate::services::{CatalogService, SessionService};
use crate::storage::BlobManager;
use crate::store::{MemoryMetadataStore, MetadataStore, SqliteMetadataStore};

/// Multipart framing allowance on top of the largest accepted file
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub sessions: Arc<SessionService>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edushelf=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EduShelf...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    let policy = UploadPolicy::new(
        &config.storage.allowed_extensions,
        config.storage.max_file_size,
    );

    // Initialize metadata store
    let store: Arc<dyn MetadataStore> = match config.database.driver {
        DatabaseDriver::Sqlite => {
            let db = Database::new(&config.database.path).await?;
            db.run_migrations().await?;
            tracing::info!("Database initialized at {}", config.database.path);
            Arc::new(SqliteMetadataStore::new(db, policy.clone()))
        }
        DatabaseDriver::Memory => {
            tracing::warn!("Using in-memory metadata store; the catalog is lost on restart");
            Arc::new(MemoryMetadataStore::new(policy.clone()))
        }
    };

    // Initialize blob storage
    let blobs = Arc::new(BlobManager::local(&config.storage.local_path, policy));
    tracing::info!("Blob storage at {}", config.storage.local_path);

    // Create app state
    let state = AppState {
        catalog: Arc::new(CatalogService::new(store, blobs)),
        sessions: Arc::new(SessionService::new(&config.auth)),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = usize::try_from(state.config.storage.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let api_routes = Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::status))
        // Categories
        .route("/categories/subjects", get(category::list_subjects))
        .route("/categories/grades", get(category::list_grades))
        .route("/categories/semesters", get(category::list_semesters))
        // Files
        .route("/files", get(file::list_files).post(file::upload_file))
        .route("/files/:id", delete(file::delete_file))
        .route("/files/:id/download", get(file::download_file))
        .route("/files/:id/view", get(file::view_file))
        .route(
            "/files/:id/download-count",
            post(file::increment_download_count),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit));

    // Combine all routes under /api
    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
