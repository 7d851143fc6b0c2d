//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREKEEP_DB_PATH, STOREKEEP_MAX_CONNECTIONS,                      │
//! │     STOREKEEP_RETRY_ATTEMPTS, STOREKEEP_CACHE_TTL_SECS,                │
//! │     STOREKEEP_ANALYTICS_TTL_SECS                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storekeep/storekeep.toml (Linux)                         │
//! │     ~/Library/Application Support/com.storekeep.storekeep/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Loja Centro"
//! operator_id = "caixa-1"
//! operator_name = "Caixa 1"
//!
//! [database]
//! path = "/var/lib/storekeep/storekeep.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [cache]
//! catalog_ttl_secs = 300    # products, sales
//! analytics_ttl_secs = 180  # customers, insights
//!
//! [retry]
//! max_attempts = 5
//! initial_backoff_ms = 100
//! max_backoff_ms = 2000
//!
//! [insights]
//! top_customers = 10
//! inactivity_alert_days = 60
//! churn_alert_threshold = 70
//! low_value_threshold_cents = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use storekeep_core::{Actor, InsightsParams, Money};
use storekeep_db::DbConfig;

use crate::cache::CacheTtl;
use crate::retry::RetryPolicy;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// The shop this engine instance serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_name")]
    pub name: String,

    /// Actor used when no interactive user is signed in.
    #[serde(default = "default_operator_id")]
    pub operator_id: String,

    #[serde(default = "default_operator_name")]
    pub operator_name: String,
}

fn default_store_name() -> String {
    "Storekeep".to_string()
}
fn default_operator_id() -> String {
    "system".to_string()
}
fn default_operator_name() -> String {
    "System".to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        StoreSection {
            name: default_store_name(),
            operator_id: default_operator_id(),
            operator_name: default_operator_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Database file. `None` means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}
fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    /// Products and sales.
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: u64,

    /// Customers and insights.
    #[serde(default = "default_analytics_ttl")]
    pub analytics_ttl_secs: u64,
}

fn default_catalog_ttl() -> u64 {
    300
}
fn default_analytics_ttl() -> u64 {
    180
}

impl Default for CacheSection {
    fn default() -> Self {
        CacheSection {
            catalog_ttl_secs: default_catalog_ttl(),
            analytics_ttl_secs: default_analytics_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    100
}
fn default_max_backoff() -> u64 {
    2_000
}

impl Default for RetrySection {
    fn default() -> Self {
        RetrySection {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsSection {
    #[serde(default = "default_top_customers")]
    pub top_customers: usize,

    #[serde(default = "default_inactivity_days")]
    pub inactivity_alert_days: i64,

    #[serde(default = "default_churn_threshold")]
    pub churn_alert_threshold: u8,

    #[serde(default = "default_low_value")]
    pub low_value_threshold_cents: i64,
}

fn default_top_customers() -> usize {
    10
}
fn default_inactivity_days() -> i64 {
    60
}
fn default_churn_threshold() -> u8 {
    70
}
fn default_low_value() -> i64 {
    10_000
}

impl Default for InsightsSection {
    fn default() -> Self {
        InsightsSection {
            top_customers: default_top_customers(),
            inactivity_alert_days: default_inactivity_days(),
            churn_alert_threshold: default_churn_threshold(),
            low_value_threshold_cents: default_low_value(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub insights: InsightsSection,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storekeep.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document (no file or environment involved).
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.cache.catalog_ttl_secs == 0 || self.cache.analytics_ttl_secs == 0 {
            return Err(ConfigError::Invalid("cache TTLs must be greater than 0".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be greater than 0".into(),
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms must not exceed retry.max_backoff_ms".into(),
            ));
        }
        if self.insights.churn_alert_threshold > 100 {
            return Err(ConfigError::Invalid(
                "insights.churn_alert_threshold must be at most 100".into(),
            ));
        }
        if self.insights.low_value_threshold_cents < 0 {
            return Err(ConfigError::Invalid(
                "insights.low_value_threshold_cents must not be negative".into(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("STOREKEEP_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = env_parse::<u32>("STOREKEEP_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }

        if let Some(attempts) = env_parse::<u32>("STOREKEEP_RETRY_ATTEMPTS") {
            self.retry.max_attempts = attempts;
        }

        if let Some(ttl) = env_parse::<u64>("STOREKEEP_CACHE_TTL_SECS") {
            self.cache.catalog_ttl_secs = ttl;
        }

        if let Some(ttl) = env_parse::<u64>("STOREKEEP_ANALYTICS_TTL_SECS") {
            self.cache.analytics_ttl_secs = ttl;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storekeep", "storekeep")
            .map(|dirs| dirs.config_dir().join("storekeep.toml"))
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    /// Database file: configured path or `<data dir>/storekeep.db`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("com", "storekeep", "storekeep")
            .ok_or_else(|| ConfigError::Invalid("Could not determine app data directory".into()))?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("storekeep.db"))
    }

    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms)))
    }

    pub fn cache_ttl(&self) -> CacheTtl {
        CacheTtl {
            catalog: Duration::from_secs(self.cache.catalog_ttl_secs),
            analytics: Duration::from_secs(self.cache.analytics_ttl_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.initial_backoff_ms),
            Duration::from_millis(self.retry.max_backoff_ms),
        )
    }

    /// The fallback actor for this terminal.
    pub fn operator(&self) -> Actor {
        Actor::new(&self.store.operator_id, &self.store.operator_name)
    }

    pub fn insights_params(&self) -> InsightsParams {
        InsightsParams {
            top_customers: self.insights.top_customers,
            inactivity_alert_days: self.insights.inactivity_alert_days,
            churn_alert_threshold: self.insights.churn_alert_threshold,
            low_value_threshold: Money::from_cents(self.insights.low_value_threshold_cents),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(value) => {
            debug!(key = key, value = %raw, "Overriding config from environment");
            Some(value)
        }
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
