//! Application configuration management.

use serde::Deserialize;

use crate::error::AppResult;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Sync worker configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Sync worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Seconds between two sync rounds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// How far back each run asks the upstream feeds for completed records.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Actor recorded as `created_by`/`posted_by` on synced transactions.
    #[serde(default = "default_actor")]
    pub actor: String,
    /// Upstream feed endpoints.
    #[serde(default)]
    pub feeds: FeedsConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            lookback_days: default_lookback_days(),
            actor: default_actor(),
            feeds: FeedsConfig::default(),
        }
    }
}

fn default_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_lookback_days() -> i64 {
    7
}

fn default_actor() -> String {
    "system:gl-sync".to_string()
}

/// Feed endpoints, one per upstream module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedsConfig {
    /// Mobile money feed.
    #[serde(default)]
    pub momo: FeedConfig,
    /// Agency banking feed.
    #[serde(default)]
    pub agency_banking: FeedConfig,
    /// Commission feed.
    #[serde(default)]
    pub commissions: FeedConfig,
    /// Expense feed.
    #[serde(default)]
    pub expenses: FeedConfig,
}

/// A single upstream feed endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Whether the worker syncs this module.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the module's transaction service.
    #[serde(default)]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_feed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            timeout_secs: default_feed_timeout_secs(),
        }
    }
}

fn default_feed_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a source cannot be read or a required
    /// setting is missing.
    pub fn load() -> AppResult<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
