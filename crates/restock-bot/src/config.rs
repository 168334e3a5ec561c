//! Application settings.
//!
//! Loaded from a TOML file and overlaid with `RESTOCK__`-prefixed environment
//! variables, e.g. `RESTOCK__BUYER__STOCK_INTERVAL_SECS=2`.

use crate::error::{AppError, AppResult};
use config::{Config, Environment, File, FileFormat};
use restock_core::RetryPolicy;
use restock_session::HttpStorefrontConfig;
use restock_telemetry::DEFAULT_LOG_DIRECTIVE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for settings overrides.
pub const ENV_PREFIX: &str = "RESTOCK";

/// Default settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "config/default.toml";

/// Purchase loop tuning shared by every item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerConfig {
    /// Delay between stock checks (seconds). Default: 3.
    #[serde(default = "default_stock_interval_secs")]
    pub stock_interval_secs: u64,
    /// Submit attempts per batch. Default: 3.
    #[serde(default = "default_submit_retry")]
    pub submit_retry: u32,
    /// Delay between submit attempts (seconds). Default: 5.
    #[serde(default = "default_submit_interval_secs")]
    pub submit_interval_secs: u64,
    /// Area used by cart entries without `areaid`.
    #[serde(default)]
    pub default_area_id: Option<String>,
    /// Stop an item after this many exhausted batches. Unset: never.
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

fn default_stock_interval_secs() -> u64 {
    3
}

fn default_submit_retry() -> u32 {
    3
}

fn default_submit_interval_secs() -> u64 {
    5
}

impl Default for BuyerConfig {
    fn default() -> Self {
        Self {
            stock_interval_secs: default_stock_interval_secs(),
            submit_retry: default_submit_retry(),
            submit_interval_secs: default_submit_interval_secs(),
            default_area_id: None,
            max_rounds: None,
        }
    }
}

impl BuyerConfig {
    pub fn stock_interval(&self) -> Duration {
        Duration::from_secs(self.stock_interval_secs)
    }

    /// Submission retry policy.
    ///
    /// # Errors
    /// Fails if `submit_retry` is zero.
    pub fn retry_policy(&self) -> AppResult<RetryPolicy> {
        Ok(RetryPolicy::new(
            self.submit_retry,
            Duration::from_secs(self.submit_interval_secs),
        )?)
    }
}

/// Storefront gateway connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Logged-in session cookie.
    #[serde(default)]
    pub cookie: Option<String>,
    /// Request timeout (seconds). Default: 10.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie: None,
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl StorefrontConfig {
    pub fn to_http_config(&self) -> HttpStorefrontConfig {
        let mut http = HttpStorefrontConfig::new(self.base_url.trim_end_matches('/'));
        http.cookie = self.cookie.clone().filter(|c| !c.trim().is_empty());
        http.timeout = Duration::from_secs(self.timeout_secs);
        if let Some(ua) = &self.user_agent {
            http.user_agent = ua.clone();
        }
        http
    }
}

/// Purchase notification push.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessengerConfig {
    /// Push via ServerChan. Default: false (log only).
    #[serde(default)]
    pub enable: bool,
    /// ServerChan send key.
    #[serde(default)]
    pub sckey: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_DIRECTIVE.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub buyer: BuyerConfig,
    #[serde(default)]
    pub storefront: StorefrontConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load settings from a TOML file overlaid with process environment.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        Self::load(path.as_ref(), Environment::with_prefix(ENV_PREFIX))
    }

    /// Load settings from `path` overlaid with an explicit environment source.
    pub fn load(path: &Path, env: Environment) -> AppResult<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .add_source(env.separator("__").try_parsing(true))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to load settings {}: {e}", path.display()))
            })?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse settings: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that can never make progress.
    pub fn validate(&self) -> AppResult<()> {
        if self.buyer.stock_interval_secs == 0 {
            return Err(AppError::Config(
                "buyer.stock_interval_secs must be at least 1".to_string(),
            ));
        }
        self.buyer.retry_policy()?;
        if self.buyer.max_rounds == Some(0) {
            return Err(AppError::Config(
                "buyer.max_rounds must be at least 1 when set".to_string(),
            ));
        }
        if self.messenger.enable && self.sckey().is_none() {
            return Err(AppError::Config(
                "messenger.sckey is required when messenger.enable is true".to_string(),
            ));
        }
        Ok(())
    }

    /// Non-blank ServerChan key.
    pub fn sckey(&self) -> Option<&str> {
        self.messenger
            .sckey
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
