//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `hearth.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use hearth_app::worker::WorkerConfig;
use hearth_domain::job::RetryPolicy;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Background worker settings.
    pub worker: WorkerSection,
    /// Retry policy applied to every new job.
    pub retry: RetrySection,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Background worker loop.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    /// Run the loop at all; jobs can still be processed via the API.
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: usize,
    /// Limit for actions that do not declare their own timeout.
    pub action_timeout_secs: u64,
    /// Age after which a `processing` job is considered abandoned.
    pub stale_after_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    pub multiplier: f64,
}

impl Config {
    /// Load configuration from `hearth.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("hearth.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HEARTH_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("HEARTH_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("HEARTH_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("HEARTH_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("HEARTH_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(secs) = var("HEARTH_WORKER_INTERVAL_SECS").and_then(|val| val.parse().ok()) {
            self.worker.interval_secs = secs;
        }
        if let Some(size) = var("HEARTH_WORKER_BATCH_SIZE").and_then(|val| val.parse().ok()) {
            self.worker.batch_size = size;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.worker.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "worker.interval_secs must be non-zero".to_string(),
            ));
        }
        if self.worker.batch_size == 0 {
            return Err(ConfigError::Validation(
                "worker.batch_size must be non-zero".to_string(),
            ));
        }
        if self.worker.action_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "worker.action_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.worker.action_timeout_secs >= self.worker.stale_after_secs {
            return Err(ConfigError::Validation(
                "worker.action_timeout_secs must be below worker.stale_after_secs".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.max_attempts must be non-zero".to_string(),
            ));
        }
        if self.retry.base_delay_secs > self.retry.max_delay_secs {
            return Err(ConfigError::Validation(
                "retry.base_delay_secs must not exceed retry.max_delay_secs".to_string(),
            ));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::Validation(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_secs(self.retry.base_delay_secs),
            max_delay: Duration::from_secs(self.retry.max_delay_secs),
            multiplier: self.retry.multiplier,
        }
    }

    #[must_use]
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            batch_size: self.worker.batch_size,
            action_timeout: Duration::from_secs(self.worker.action_timeout_secs),
            stale_after: Duration::from_secs(self.worker.stale_after_secs),
            retry: self.retry_policy(),
        }
    }

    /// Pause between two worker passes.
    #[must_use]
    pub fn worker_interval(&self) -> Duration {
        Duration::from_secs(self.worker.interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:hearth.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hearthd=info,hearth=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 5,
            batch_size: 10,
            action_timeout_secs: 30,
            stale_after_secs: 15 * 60,
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 30,
            max_delay_secs: 3600,
            multiplier: 2.0,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
