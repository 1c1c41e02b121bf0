use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Auth status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub is_admin: bool,
}

/// Session attached to every request by the session middleware
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Session id from the cookie, present only if it is still registered
    pub id: Option<String>,
    pub is_admin: bool,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn admin(id: String) -> Self {
        Self {
            id: Some(id),
            is_admin: true,
        }
    }
}
