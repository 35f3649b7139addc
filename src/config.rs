//! Configuration management for Blobpilot
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{PilotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Blobpilot
///
/// Every section has defaults, so an empty or missing file yields a
/// usable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session snapshot location
    #[serde(default)]
    pub store: StoreConfig,
    /// Collaborator endpoints
    #[serde(default)]
    pub network: NetworkConfig,
    /// Batch upload defaults
    #[serde(default)]
    pub batch: BatchConfig,
    /// Ledger registration and confirmation settings
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Bulk deletion settings
    #[serde(default)]
    pub deletion: DeletionConfig,
    /// Content generator settings
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Logging output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Snapshot file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the full-snapshot JSON file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./sessions.json")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Storage network and ledger endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Base URL of the storage network RPC
    #[serde(default = "default_storage_url")]
    pub storage_url: String,

    /// Base URL of the ledger REST API
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    /// Per-request timeout for collaborator calls (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_storage_url() -> String {
    "http://127.0.0.1:9090".to_string()
}

fn default_ledger_url() -> String {
    "http://127.0.0.1:8080/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            storage_url: default_storage_url(),
            ledger_url: default_ledger_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Batch driver defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Idle wait between items (milliseconds)
    #[serde(default = "default_delay_ms")]
    pub default_delay_ms: u64,

    /// Item count used when the caller does not give one
    #[serde(default = "default_count")]
    pub default_count: usize,

    /// Upper bound accepted for a single batch
    #[serde(default = "default_max_count")]
    pub max_count: usize,
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_count() -> usize {
    10
}

fn default_max_count() -> usize {
    1000
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: default_delay_ms(),
            default_count: default_count(),
            max_count: default_max_count(),
        }
    }
}

/// Ledger registration and confirmation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Bound on waiting for a transaction to finalize (seconds)
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_seconds: u64,

    /// Interval between finalization polls (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Object expiration, counted from registration time (days)
    #[serde(default = "default_expiration_days")]
    pub expiration_days: i64,
}

fn default_confirmation_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    1000
}

/// Longest object lifetime accepted at registration
pub const MAX_EXPIRATION_DAYS: i64 = 36_500;

fn default_expiration_days() -> i64 {
    30
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_seconds: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
            expiration_days: default_expiration_days(),
        }
    }
}

impl LedgerConfig {
    /// Confirmation bound as a `Duration`
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_seconds)
    }
}

/// Deletion driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionConfig {
    /// Cooldown after each successfully deleted item (milliseconds)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_cooldown_ms() -> u64 {
    1500
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Content generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of the random image service
    #[serde(default = "default_image_url")]
    pub image_url: String,

    /// Requested image width in pixels
    #[serde(default = "default_image_width")]
    pub image_width: u32,

    /// Requested image height in pixels
    #[serde(default = "default_image_height")]
    pub image_height: u32,

    /// Size of the random block produced when the image fetch fails
    #[serde(default = "default_fallback_size")]
    pub fallback_size_bytes: usize,

    /// Timeout for a single image fetch (seconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
}

fn default_image_url() -> String {
    "https://picsum.photos".to_string()
}

fn default_image_width() -> u32 {
    800
}

fn default_image_height() -> u32 {
    600
}

fn default_fallback_size() -> usize {
    50_000
}

fn default_fetch_timeout() -> u64 {
    15
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            image_url: default_image_url(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            fallback_size_bytes: default_fallback_size(),
            fetch_timeout_seconds: default_fetch_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,

    /// Optional file receiving a copy of the log output
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file, environment, and CLI
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command line arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&contents).map_err(PilotError::from)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(path) = std::env::var("BLOBPILOT_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("BLOBPILOT_STORAGE_URL") {
            self.network.storage_url = url;
        }

        if let Ok(url) = std::env::var("BLOBPILOT_LEDGER_URL") {
            self.network.ledger_url = url;
        }

        if let Ok(delay) = std::env::var("BLOBPILOT_DELAY_MS") {
            if let Ok(value) = delay.parse() {
                self.batch.default_delay_ms = value;
            } else {
                tracing::warn!("Invalid BLOBPILOT_DELAY_MS: {}", delay);
            }
        }

        if let Ok(timeout) = std::env::var("BLOBPILOT_CONFIRMATION_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.ledger.confirmation_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid BLOBPILOT_CONFIRMATION_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(url) = std::env::var("BLOBPILOT_IMAGE_URL") {
            self.generator.image_url = url;
        }

        if let Ok(level) = std::env::var("BLOBPILOT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("BLOBPILOT_LOG_JSON") {
            self.logging.json = matches!(json.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(store) = &cli.store {
            self.store.path = store.clone();
        }

        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `PilotError::Config` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        validate_url("network.storage_url", &self.network.storage_url)?;
        validate_url("network.ledger_url", &self.network.ledger_url)?;

        if self.network.request_timeout_seconds == 0 {
            return Err(PilotError::Config(
                "network.request_timeout_seconds must be greater than 0".into(),
            )
            .into());
        }

        if self.batch.max_count == 0 {
            return Err(PilotError::Config("batch.max_count must be greater than 0".into()).into());
        }

        if self.ledger.confirmation_timeout_seconds == 0 {
            return Err(PilotError::Config(
                "ledger.confirmation_timeout_seconds must be greater than 0".into(),
            )
            .into());
        }

        if self.ledger.poll_interval_ms == 0 {
            return Err(
                PilotError::Config("ledger.poll_interval_ms must be greater than 0".into()).into(),
            );
        }

        if self.ledger.expiration_days <= 0 {
            return Err(
                PilotError::Config("ledger.expiration_days must be greater than 0".into()).into(),
            );
        }

        if self.ledger.expiration_days > MAX_EXPIRATION_DAYS {
            return Err(PilotError::Config(format!(
                "ledger.expiration_days must be at most {}",
                MAX_EXPIRATION_DAYS
            ))
            .into());
        }

        validate_url("generator.image_url", &self.generator.image_url)?;

        if self.generator.image_width == 0 || self.generator.image_height == 0 {
            return Err(PilotError::Config(
                "generator image dimensions must be greater than 0".into(),
            )
            .into());
        }

        if self.generator.fetch_timeout_seconds == 0 {
            return Err(PilotError::Config(
                "generator.fetch_timeout_seconds must be greater than 0".into(),
            )
            .into());
        }

        if self.generator.fallback_size_bytes == 0 {
            return Err(PilotError::Config(
                "generator.fallback_size_bytes must be greater than 0".into(),
            )
            .into());
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value.trim())
        .map_err(|e| PilotError::Config(format!("{} is not a valid URL: {}", field, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PilotError::Config(format!("{} must use http or https", field)).into());
    }
    Ok(())
}
