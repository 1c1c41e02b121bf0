use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Which metadata store backs the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    Sqlite,
    Memory,
}

impl DatabaseDriver {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(DatabaseDriver::Sqlite),
            "memory" => Some(DatabaseDriver::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_driver")]
    pub driver: DatabaseDriver,
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default)]
    pub admin_password: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub cookie_secure: bool,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_db_driver() -> DatabaseDriver {
    DatabaseDriver::Sqlite
}

fn default_db_path() -> String {
    "data/edushelf.db".to_string()
}

fn default_local_path() -> String {
    "data/uploads".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_extensions() -> Vec<String> {
    ["pdf", "docx", "pptx", "xlsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_session_ttl() -> i64 {
    24
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: default_db_driver(),
            path: default_db_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: default_local_path(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_password: String::new(),
            session_ttl_hours: default_session_ttl(),
            cookie_secure: false,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.normalize_extensions();
        config.ensure_directories()?;
        config.ensure_admin_password()?;
        tracing::info!(
            "Catalog config: driver={:?}, uploads={}, max_file_size={}, extensions={:?}",
            config.database.driver,
            config.storage.local_path,
            config.storage.max_file_size,
            config.storage.allowed_extensions
        );
        Ok(config)
    }

    /// Ensure an admin password exists and is persisted
    fn ensure_admin_password(&mut self) -> anyhow::Result<()> {
        if !self.auth.admin_password.is_empty() {
            return Ok(());
        }

        let password_path = Path::new("data/.admin_password");

        if password_path.exists() {
            let password = fs::read_to_string(password_path)?;
            self.auth.admin_password = password.trim().to_string();
            tracing::info!("Loaded persisted admin password from data/.admin_password");
        } else {
            let password = uuid::Uuid::new_v4().simple().to_string();

            if let Some(parent) = password_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(password_path, &password)?;
            self.auth.admin_password = password;
            tracing::warn!(
                "No admin password configured; generated one in data/.admin_password"
            );
        }
        Ok(())
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: ES_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(val) = env::var("ES_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = env::var("ES_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Database overrides
        if let Ok(val) = env::var("ES_CONF_DATABASE_DRIVER") {
            match DatabaseDriver::parse(&val) {
                Some(driver) => self.database.driver = driver,
                None => tracing::warn!("Ignoring unknown database driver {:?}", val),
            }
        }
        if let Ok(val) = env::var("ES_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Storage overrides
        if let Ok(val) = env::var("ES_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }
        if let Ok(val) = env::var("ES_CONF_STORAGE_MAX_FILE_SIZE") {
            if let Ok(size) = val.parse() {
                self.storage.max_file_size = size;
            }
        }
        if let Ok(val) = env::var("ES_CONF_STORAGE_ALLOWED_EXTENSIONS") {
            self.storage.allowed_extensions = val
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
        }

        // Auth overrides, legacy names first so the prefixed ones win
        if let Ok(val) = env::var("ADMIN_USERNAME") {
            self.auth.admin_username = val;
        }
        if let Ok(val) = env::var("ADMIN_PASSWORD") {
            self.auth.admin_password = val;
        }
        if let Ok(val) = env::var("ES_CONF_AUTH_ADMIN_USERNAME") {
            self.auth.admin_username = val;
        }
        if let Ok(val) = env::var("ES_CONF_AUTH_ADMIN_PASSWORD") {
            self.auth.admin_password = val;
        }
        if let Ok(val) = env::var("ES_CONF_AUTH_SESSION_TTL_HOURS") {
            if let Ok(hours) = val.parse() {
                self.auth.session_ttl_hours = hours;
            }
        }
        if let Ok(val) = env::var("ES_CONF_AUTH_COOKIE_SECURE") {
            if let Ok(v) = val.parse() {
                self.auth.cookie_secure = v;
            }
        }
    }

    /// Lowercase extensions and strip any leading dot
    fn normalize_extensions(&mut self) {
        self.storage.allowed_extensions = self
            .storage
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if self.database.driver == DatabaseDriver::Sqlite {
            if let Some(parent) = Path::new(&self.database.path).parent() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::create_dir_all(&self.storage.local_path)?;

        Ok(())
    }
}
