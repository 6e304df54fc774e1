use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::scoring::{Range, ScoringPolicy};
use crate::utils::RetryPolicy;

use super::tokens::Basket;

/// Market-data provider (CoinGecko Pro) configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MarketSettings {
    #[serde(default = "default_market_base_url")]
    pub base_url: String,
    /// Sent as `x-cg-pro-api-key`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_market_base_url() -> String {
    "https://pro-api.coingecko.com/api/v3".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Social search provider (X API v2) configuration and the daily item budget.
#[derive(Debug, Deserialize, Clone)]
pub struct SocialSettings {
    #[serde(default = "default_social_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Maximum items fetched per calendar day across the whole basket.
    #[serde(default = "default_daily_budget")]
    pub daily_budget: u32,
    /// Upper bound on items requested for a single token.
    #[serde(default = "default_per_token_cap")]
    pub per_token_cap: u32,
    /// Pause between two tokens' searches.
    #[serde(default = "default_social_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_social_retry")]
    pub retry: RetryPolicy,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_social_base_url() -> String {
    "https://api.twitter.com/2".to_string()
}

fn default_daily_budget() -> u32 {
    500 // ~15,000 per month
}

fn default_per_token_cap() -> u32 {
    100
}

fn default_social_request_delay_ms() -> u64 {
    3_000
}

fn default_social_retry() -> RetryPolicy {
    RetryPolicy::new(4, Duration::from_secs(5), Duration::from_secs(15 * 60))
}

impl SocialSettings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for SocialSettings {
    fn default() -> Self {
        Self {
            base_url: default_social_base_url(),
            bearer_token: None,
            daily_budget: default_daily_budget(),
            per_token_cap: default_per_token_cap(),
            request_delay_ms: default_social_request_delay_ms(),
            retry: default_social_retry(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Blend used for the per-token on-chain activity score.
///
/// Every component is normalized into [0, 100] before blending.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActivityPolicy {
    /// Transaction count that scores 100.
    pub transaction_ceiling: f64,
    /// SOL volume that scores 100.
    pub sol_volume_ceiling: f64,
    /// Percentage change mapped onto [0, 100].
    pub change_range: Range,
    pub transaction_weight: f64,
    pub volume_change_weight: f64,
    pub sol_volume_weight: f64,
    pub sol_volume_change_weight: f64,
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        Self {
            transaction_ceiling: 1_000.0,
            sol_volume_ceiling: 1_000.0,
            change_range: Range::new(-100.0, 100.0),
            transaction_weight: 0.4,
            volume_change_weight: 0.2,
            sol_volume_weight: 0.2,
            sol_volume_change_weight: 0.2,
        }
    }
}

/// Solana JSON-RPC configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct OnChainSettings {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Most recent signatures requested per token.
    #[serde(default = "default_signature_limit")]
    pub signature_limit: u32,
    /// Transactions fetched per day bucket for volume estimation.
    #[serde(default = "default_transaction_sample")]
    pub transaction_sample: usize,
    /// Pause between two tokens.
    #[serde(default = "default_token_delay_ms")]
    pub token_delay_ms: u64,
    #[serde(default = "default_onchain_retry")]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub activity: ActivityPolicy,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_signature_limit() -> u32 {
    1_000
}

fn default_transaction_sample() -> usize {
    25
}

fn default_token_delay_ms() -> u64 {
    1_000
}

fn default_onchain_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(8))
}

impl OnChainSettings {
    pub fn token_delay(&self) -> Duration {
        Duration::from_millis(self.token_delay_ms)
    }
}

impl Default for OnChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            signature_limit: default_signature_limit(),
            transaction_sample: default_transaction_sample(),
            token_delay_ms: default_token_delay_ms(),
            retry: default_onchain_retry(),
            activity: ActivityPolicy::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where the history document and the daily snapshots live.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_history_file")]
    pub history_file: String,
    /// Entries kept in the history document.
    #[serde(default = "default_retention")]
    pub retention: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_history_file() -> String {
    "over-back-history.json".to_string()
}

fn default_retention() -> usize {
    365
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            history_file: default_history_file(),
            retention: default_retention(),
        }
    }
}

/// Daily trigger configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleSettings {
    /// Six-field cron expression, evaluated in UTC.
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

fn default_cron() -> String {
    "0 0 13 * * *".to_string() // 08:00 US-Eastern (standard time)
}

fn default_run_on_startup() -> bool {
    true
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            run_on_startup: default_run_on_startup(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Root application configuration.
///
/// Loaded from an optional `config.yaml` overlaid with `OVERBACK__*` environment
/// variables (e.g. `OVERBACK__SOCIAL__BEARER_TOKEN`). Every field has a default,
/// so only the provider secrets need to be supplied.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub market: MarketSettings,
    #[serde(default)]
    pub social: SocialSettings,
    #[serde(default)]
    pub onchain: OnChainSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub scoring: ScoringPolicy,
    #[serde(default)]
    pub basket: Basket,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("OVERBACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Parses settings from a YAML document, without environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;

        let settings: Settings = s.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate().map_err(ConfigError::Message)?;

        if self.social.daily_budget == 0 {
            return Err(ConfigError::Message(
                "social.daily_budget must be positive".to_string(),
            ));
        }
        if self.storage.retention == 0 {
            return Err(ConfigError::Message(
                "storage.retention must be positive".to_string(),
            ));
        }
        if self.basket.core.is_empty() {
            return Err(ConfigError::Message(
                "basket.core must list at least one token".to_string(),
            ));
        }

        Ok(())
    }
}
