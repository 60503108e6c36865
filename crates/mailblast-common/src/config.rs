//! Configuration for Mailblast

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// SMTP relay configuration
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Job queue configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Batch scheduling configuration
    #[serde(default)]
    pub batch: BatchConfig,

    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            smtp: SmtpConfig::default(),
            queue: QueueConfig::default(),
            batch: BatchConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/var/lib/mailblast/jobs.db")
}

fn default_max_connections() -> u32 {
    5
}

/// SMTP relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Relay hostname
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// Relay port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    pub username: Option<String>,
    pub password: Option<String>,

    /// Use implicit TLS
    #[serde(default)]
    pub use_tls: bool,

    /// Use STARTTLS
    #[serde(default = "default_use_starttls")]
    pub use_starttls: bool,

    /// Envelope sender address
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Transport timeout in seconds
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: false,
            use_starttls: default_use_starttls(),
            from_address: default_from_address(),
            timeout_secs: default_smtp_timeout(),
        }
    }
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_starttls() -> bool {
    true
}

fn default_from_address() -> String {
    "mailblast@localhost".to_string()
}

fn default_smtp_timeout() -> u64 {
    30
}

/// Job queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Simultaneously active jobs
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Maximum job starts per rate window
    #[serde(default = "default_start_limit_max")]
    pub start_limit_max: usize,

    /// Rate window length in milliseconds
    #[serde(default = "default_start_limit_window_ms")]
    pub start_limit_window_ms: u64,

    /// Interval between queue polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum attempts per job before it is marked failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,

    /// Base retry backoff in milliseconds; doubles per attempt
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Age after which completed jobs are purged, in seconds
    #[serde(default = "default_completed_retention_secs")]
    pub completed_retention_secs: i64,

    /// Maximum completed jobs retained regardless of age
    #[serde(default = "default_completed_retention_count")]
    pub completed_retention_count: i64,

    /// Age after which failed jobs are purged, in seconds
    #[serde(default = "default_failed_retention_secs")]
    pub failed_retention_secs: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: default_worker_concurrency(),
            start_limit_max: default_start_limit_max(),
            start_limit_window_ms: default_start_limit_window_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            completed_retention_secs: default_completed_retention_secs(),
            completed_retention_count: default_completed_retention_count(),
            failed_retention_secs: default_failed_retention_secs(),
        }
    }
}

fn default_worker_concurrency() -> usize {
    3
}

fn default_start_limit_max() -> usize {
    5
}

fn default_start_limit_window_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_max_attempts() -> i32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_completed_retention_secs() -> i64 {
    24 * 3600
}

fn default_completed_retention_count() -> i64 {
    1000
}

fn default_failed_retention_secs() -> i64 {
    7 * 24 * 3600
}

/// Batch scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Recipients sent concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    100
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address
    #[serde(default = "default_api_bind")]
    pub bind: String,

    /// API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_api_bind(),
            port: default_api_port(),
        }
    }
}

fn default_api_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from default locations, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let paths = [
            std::path::PathBuf::from("./mailblast.toml"),
            std::path::PathBuf::from("/etc/mailblast/mailblast.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let queue = QueueConfig::default();
        assert_eq!(queue.worker_concurrency, 3);
        assert_eq!(queue.max_attempts, 3);
        assert_eq!(queue.backoff_base_ms, 2000);
        assert_eq!(queue.completed_retention_secs, 86400);
        assert_eq!(queue.failed_retention_secs, 604800);

        let batch = BatchConfig::default();
        assert_eq!(batch.batch_size, 10);
        assert_eq!(batch.batch_delay_ms, 100);

        let smtp = SmtpConfig::default();
        assert_eq!(smtp.port, 587);
        assert!(smtp.use_starttls);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[database]
path = "/data/mailblast/jobs.db"

[smtp]
host = "smtp.example.com"
port = 465
use_tls = true
from_address = "news@example.com"

[queue]
worker_concurrency = 5

[batch]
batch_size = 25
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.smtp.host, "smtp.example.com");
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.queue.worker_concurrency, 5);
        assert_eq!(config.batch.batch_size, 25);
        // Untouched sections keep their defaults
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.batch.batch_delay_ms, 100);
    }
}
