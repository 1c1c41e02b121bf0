use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AppError, Result};

/// Admin sessions keyed by the random id stored in the session cookie
pub struct SessionService {
    admin_username: String,
    admin_password: String,
    ttl: Duration,
    sessions: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            admin_username: config.admin_username.clone(),
            admin_password: config.admin_password.clone(),
            ttl: Duration::hours(config.session_ttl_hours.max(1)),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open an admin session on an exact credential match
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        if self.admin_password.is_empty()
            || username != self.admin_username
            || password != self.admin_password
        {
            tracing::warn!("Rejected admin login for {:?}", username);
            return Err(AppError::Unauthorized);
        }

        let id = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.ttl;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, exp| *exp > Utc::now());
        sessions.insert(id.clone(), expires_at);

        tracing::info!("Admin session opened");
        Ok(id)
    }

    /// Whether `id` names a live admin session
    pub async fn is_admin(&self, id: &str) -> bool {
        let expired = match self.sessions.read().await.get(id) {
            Some(exp) if *exp > Utc::now() => return true,
            Some(_) => true,
            None => false,
        };
        if expired {
            self.sessions.write().await.remove(id);
        }
        false
    }

    pub async fn logout(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            tracing::info!("Admin session closed");
        }
    }
}
