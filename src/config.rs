//! # Unified Application Configuration
//!
//! All application settings live in one structured [`AppConfig`], loaded
//! from environment variables and validated section by section before the
//! bot starts.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;

/// Bot-specific configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
    /// Window during which a repeated scan of the same barcode is ignored
    pub scan_dedup_ttl_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_timeout_secs: 30,
            scan_dedup_ttl_secs: 5,
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        let parts: Vec<&str> = self.token.split(':').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(
                "Bot token format is invalid. Expected format: 'bot_id:bot_token'".to_string(),
            ));
        }

        if parts[0].parse::<u64>().is_err() {
            return Err(AppError::Config(
                "Bot token bot ID must be numeric".to_string(),
            ));
        }

        if parts[1].len() < 20 {
            return Err(AppError::Config(
                "Bot token appears to be too short. Please verify it's a valid token".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 || self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if self.scan_dedup_ttl_secs > 3600 {
            return Err(AppError::Config(
                "Scan deduplication TTL cannot be greater than 3600 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Database configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Minimum number of idle connections
    pub min_connections: u32,
    /// Maximum lifetime of a connection in seconds
    pub max_lifetime_secs: Option<u64>,
    /// Maximum time a connection can be idle in seconds
    pub idle_timeout_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            connect_timeout_secs: 30,
            min_connections: 1,
            max_lifetime_secs: Some(1800),
            idle_timeout_secs: Some(600),
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::Config("Database URL cannot be empty".to_string()));
        }

        if !self.url.starts_with("postgresql://") && !self.url.starts_with("postgres://") {
            return Err(AppError::Config(
                "Database URL must start with 'postgresql://' or 'postgres://'".to_string(),
            ));
        }

        let connection_part = self.url.split("://").nth(1).unwrap_or_default();
        if !connection_part.contains('@') {
            return Err(AppError::Config(
                "Database URL must contain authentication information".to_string(),
            ));
        }

        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(AppError::Config(
                "Max connections must be between 1 and 100".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > 300 {
            return Err(AppError::Config(
                "Connect timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(AppError::Config(
                "Min connections cannot be greater than max connections".to_string(),
            ));
        }

        Ok(())
    }
}

/// Where blacklists are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "file" | "json" => Ok(StorageBackend::File),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => Err(AppError::Config(format!(
                "STORAGE_BACKEND must be one of memory, file, postgres (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageBackend::Memory => "memory",
            StorageBackend::File => "file",
            StorageBackend::Postgres => "postgres",
        };
        f.write_str(name)
    }
}

/// Blacklist storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON file used by the file backend
    pub file_path: String,
    /// Connection settings used by the postgres backend
    pub database: DatabaseConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            file_path: "data/blacklists.json".to_string(),
            database: DatabaseConfig::default(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> AppResult<()> {
        match self.backend {
            StorageBackend::Postgres => self.database.validate(),
            StorageBackend::File if self.file_path.trim().is_empty() => Err(AppError::Config(
                "BLACKLIST_FILE_PATH cannot be empty for the file backend".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Product lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Product endpoint prefix; `/{barcode}.json` is appended
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
    /// How long a found product stays cached
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    /// Consecutive failures before lookups fail fast
    pub circuit_breaker_threshold: u32,
    /// Seconds the breaker stays open
    pub circuit_breaker_reset_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.org/api/v0/product".to_string(),
            timeout_secs: 10,
            user_agent: format!(
                "IsItSafeBot/{} (ingredient blacklist checker)",
                env!("CARGO_PKG_VERSION")
            ),
            cache_ttl_secs: 3600,
            cache_max_entries: 1000,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
        }
    }
}

impl LookupConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "OFF_BASE_URL must be an http(s) URL (got '{}')",
                self.base_url
            )));
        }

        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(AppError::Config(
                "Lookup timeout must be between 1 and 120 seconds".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(AppError::Config("User agent cannot be empty".to_string()));
        }

        if self.cache_max_entries == 0 {
            return Err(AppError::Config(
                "Product cache size cannot be 0".to_string(),
            ));
        }

        if self.circuit_breaker_threshold == 0 {
            return Err(AppError::Config(
                "Circuit breaker threshold cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Server configuration for health checks and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port serving `/metrics` and `/health/*`
    pub metrics_port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            allow_privileged_ports: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.metrics_port == 0 {
            return Err(AppError::Config("Metrics port cannot be 0".to_string()));
        }

        if !self.allow_privileged_ports && self.metrics_port < 1024 {
            return Err(AppError::Config(format!(
                "Metrics port {} is privileged. Set allow_privileged_ports=true or use port >= 1024",
                self.metrics_port
            )));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub storage: StorageConfig,
    pub lookup: LookupConfig,
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
}

fn env_or<T: FromStr>(name: &str, default: &str) -> AppResult<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a valid number", name)))
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        config.bot.token = env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
            AppError::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        config.bot.http_timeout_secs = env_or("HTTP_CLIENT_TIMEOUT_SECS", "30")?;
        config.bot.scan_dedup_ttl_secs = env_or("SCAN_DEDUP_TTL_SECS", "5")?;

        let database_url = env::var("DATABASE_URL").ok();
        config.storage.backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) if database_url.is_some() => StorageBackend::Postgres,
            Err(_) => StorageBackend::File,
        };
        if let Ok(path) = env::var("BLACKLIST_FILE_PATH") {
            config.storage.file_path = path;
        }
        config.storage.database.url = database_url.unwrap_or_default();
        config.storage.database.max_connections = env_or("DATABASE_MAX_CONNECTIONS", "10")?;
        config.storage.database.min_connections = env_or("DATABASE_MIN_CONNECTIONS", "1")?;
        config.storage.database.connect_timeout_secs =
            env_or("DATABASE_CONNECT_TIMEOUT_SECS", "30")?;

        if let Ok(url) = env::var("OFF_BASE_URL") {
            config.lookup.base_url = url;
        }
        if let Ok(agent) = env::var("OFF_USER_AGENT") {
            config.lookup.user_agent = agent;
        }
        config.lookup.timeout_secs = env_or("OFF_TIMEOUT_SECS", "10")?;
        config.lookup.cache_ttl_secs = env_or("PRODUCT_CACHE_TTL_SECS", "3600")?;
        config.lookup.circuit_breaker_threshold = env_or("CIRCUIT_BREAKER_THRESHOLD", "5")?;
        config.lookup.circuit_breaker_reset_secs = env_or("CIRCUIT_BREAKER_RESET_SECS", "60")?;

        config.server.metrics_port = env::var("METRICS_PORT")
            .unwrap_or_else(|_| "9090".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("METRICS_PORT must be a valid port number".to_string())
            })?;
        config.server.allow_privileged_ports = env::var("ALLOW_PRIVILEGED_PORTS")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.storage.validate()?;
        self.lookup.validate()?;
        self.server.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], storage_backend={}, db_url=[REDACTED], lookup_base_url={}, lookup_timeout_secs={}, metrics_port={}, environment={}",
            self.storage.backend,
            self.lookup.base_url,
            self.lookup.timeout_secs,
            self.server.metrics_port,
            self.observability.environment
        )
    }
}
