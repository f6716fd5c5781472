//! # Cashdesk Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CASHDESK_DB_PATH=/srv/cashdesk/shop.db                             │
//! │     CASHDESK_COST_BASIS=snapshot                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/cashdesk/cashdesk.toml (Linux)                           │
//! │     ~/Library/Application Support/com.cashdesk.cashdesk/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/cashdesk/shop.db"
//! max_connections = 5
//!
//! [checkout]
//! unit_of_work_timeout_ms = 10000
//! transaction_number_prefix = "TXN"
//!
//! [reporting]
//! utc_offset_minutes = 300    # UTC+05:00
//! cost_basis = "current"      # current | snapshot
//!
//! [logging]
//! filter = "info,cashdesk=debug,sqlx=warn"
//! ```

use cashdesk_core::report::offset_from_minutes;
use cashdesk_core::CostBasis;
use cashdesk_db::{DbConfig, StoreOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long a writer waits on SQLite's lock before failing as busy.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Upper bound on one checkout, cancellation or report.
    #[serde(default = "default_unit_of_work_timeout")]
    pub unit_of_work_timeout_ms: u64,

    #[serde(default = "default_prefix")]
    pub transaction_number_prefix: String,
}

fn default_unit_of_work_timeout() -> u64 {
    10_000
}
fn default_prefix() -> String {
    cashdesk_core::TRANSACTION_NUMBER_PREFIX.to_string()
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            unit_of_work_timeout_ms: default_unit_of_work_timeout(),
            transaction_number_prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportingSettings {
    /// Reference time zone for calendar days, as minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,

    #[serde(default)]
    pub cost_basis: CostBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info,cashdesk=debug,sqlx=warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CashdeskConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub reporting: ReportingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl CashdeskConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`cashdesk.toml`); an explicit path must exist
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if explicit || path.exists() {
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Rejects settings the database layer cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::invalid(
                "database.max_connections",
                "must be greater than 0",
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::invalid(
                "database.min_connections",
                "must not exceed max_connections",
            ));
        }
        if self.checkout.unit_of_work_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "checkout.unit_of_work_timeout_ms",
                "must be greater than 0",
            ));
        }

        let prefix = &self.checkout.transaction_number_prefix;
        if prefix.is_empty() || prefix.len() > 10 || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::invalid(
                "checkout.transaction_number_prefix",
                "must be 1 to 10 ASCII letters or digits",
            ));
        }

        offset_from_minutes(self.reporting.utc_offset_minutes)
            .map_err(|e| ConfigError::invalid("reporting.utc_offset_minutes", e.to_string()))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `CASHDESK_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("CASHDESK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("CASHDESK_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring CASHDESK_MAX_CONNECTIONS"),
            }
        }

        if let Some(ms) = lookup("CASHDESK_UNIT_OF_WORK_TIMEOUT_MS") {
            match ms.parse() {
                Ok(n) => self.checkout.unit_of_work_timeout_ms = n,
                Err(_) => warn!(value = %ms, "Ignoring CASHDESK_UNIT_OF_WORK_TIMEOUT_MS"),
            }
        }

        if let Some(prefix) = lookup("CASHDESK_TRANSACTION_PREFIX") {
            self.checkout.transaction_number_prefix = prefix;
        }

        if let Some(minutes) = lookup("CASHDESK_UTC_OFFSET_MINUTES") {
            match minutes.parse() {
                Ok(n) => self.reporting.utc_offset_minutes = n,
                Err(_) => warn!(value = %minutes, "Ignoring CASHDESK_UTC_OFFSET_MINUTES"),
            }
        }

        if let Some(basis) = lookup("CASHDESK_COST_BASIS") {
            match basis.parse() {
                Ok(parsed) => self.reporting.cost_basis = parsed,
                Err(_) => warn!(value = %basis, "Ignoring CASHDESK_COST_BASIS"),
            }
        }

        if let Some(filter) = lookup("CASHDESK_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "cashdesk", "cashdesk")
            .map(|dirs| dirs.config_dir().join("cashdesk.toml"))
    }

    /// Database file to open: configured path, else the platform data directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        directories::ProjectDirs::from("com", "cashdesk", "cashdesk")
            .map(|dirs| dirs.data_dir().join("cashdesk.db"))
            .unwrap_or_else(|| PathBuf::from("cashdesk.db"))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    pub fn store_options(&self) -> ConfigResult<StoreOptions> {
        let utc_offset = offset_from_minutes(self.reporting.utc_offset_minutes)
            .map_err(|e| ConfigError::invalid("reporting.utc_offset_minutes", e.to_string()))?;

        Ok(StoreOptions {
            unit_of_work_timeout: Duration::from_millis(self.checkout.unit_of_work_timeout_ms),
            transaction_number_prefix: self.checkout.transaction_number_prefix.clone(),
            utc_offset,
            cost_basis: self.reporting.cost_basis,
        })
    }
}
