use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::models::Session;
use crate::AppState;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "es_session";

/// Session middleware
/// Resolves the session cookie and attaches a `Session` to every request.
/// Unknown or expired ids yield an anonymous session, never an error.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match jar.get(SESSION_COOKIE) {
        Some(cookie) if state.sessions.is_admin(cookie.value()).await => {
            Session::admin(cookie.value().to_string())
        }
        _ => Session::anonymous(),
    };

    request.extensions_mut().insert(session);

    next.run(request).await
}
