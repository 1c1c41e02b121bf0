use axum::{extract::State, response::IntoResponse, Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::{ApiResponse, AppError, Result};
use crate::middleware::session::SESSION_COOKIE;
use crate::models::{AuthStatus, LoginRequest, Session};
use crate::AppState;

/// Log in as admin
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let session_id = state.sessions.login(&req.username, &req.password).await?;

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.cookie_secure)
        .path("/")
        .build();

    Ok((
        jar.add(cookie),
        Json(ApiResponse::success_message("Login successful")),
    ))
}

/// End the admin session
/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse> {
    let id = match session.id {
        Some(id) if session.is_admin => id,
        _ => return Err(AppError::Unauthorized),
    };
    state.sessions.logout(&id).await;

    let remove = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.cookie_secure)
        .path("/")
        .build();

    Ok((
        jar.remove(remove),
        Json(ApiResponse::success_message("Logged out successfully")),
    ))
}

/// Report whether the caller holds an admin session
/// GET /api/auth/status
pub async fn status(Extension(session): Extension<Session>) -> Json<AuthStatus> {
    Json(AuthStatus {
        is_admin: session.is_admin,
    })
}
