//! Dispatcher configuration.
//!
//! This module provides TOML-based configuration for retry and rate limit
//! defaults. The configuration system supports:
//! - Bundled defaults (include_str! from courier.toml)
//! - User overrides (./courier.toml or ~/.config/courier/courier.toml)
//! - Automatic merging with user values taking precedence

use courier_core::{RateLimitPolicy, RetryPolicy};
use courier_error::{ConfigError, CourierError, CourierResult};
use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Top-level dispatcher configuration.
///
/// # Example
///
/// ```toml
/// default_throttle_secs = 60
///
/// [retry]
/// max_attempts = 3
/// base_delay_ms = 1000
/// max_delay_ms = 30000
/// backoff_multiplier = 2.0
///
/// [rate_limit]
/// requests_per_minute = 60
/// burst = 10
///
/// [providers.openai]
/// requests_per_minute = 500
/// burst = 50
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Retry policy for requests submitted without an override
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Rate limit policy for providers without an override
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,

    /// Throttle length when a rate-limited response carries no retry-after
    #[serde(default = "default_throttle_secs")]
    pub default_throttle_secs: u64,

    /// Provider-specific rate limit policies keyed by provider id
    #[serde(default)]
    pub providers: HashMap<String, RateLimitPolicy>,
}

fn default_throttle_secs() -> u64 {
    60
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            rate_limit: RateLimitPolicy::default(),
            default_throttle_secs: default_throttle_secs(),
            providers: HashMap::new(),
        }
    }
}

impl DispatchConfig {
    /// Throttle length applied when a provider gives no retry-after hint.
    pub fn default_throttle(&self) -> Duration {
        Duration::from_secs(self.default_throttle_secs)
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CourierResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                CourierError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CourierError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (courier.toml shipped with the library)
    /// 2. User config in home directory (~/.config/courier/courier.toml)
    /// 3. User config in current directory (./courier.toml)
    ///
    /// User config files are optional and will be silently skipped if not found.
    #[instrument]
    pub fn load() -> CourierResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../courier.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/courier/courier.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("courier").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                CourierError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CourierError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check every policy in the configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first invalid section.
    pub fn validate(&self) -> CourierResult<()> {
        self.retry
            .validate()
            .map_err(|e| ConfigError::new(format!("[retry] {}", e)))?;
        self.rate_limit
            .validate()
            .map_err(|e| ConfigError::new(format!("[rate_limit] {}", e)))?;
        for (provider, policy) in &self.providers {
            policy
                .validate()
                .map_err(|e| ConfigError::new(format!("[providers.{}] {}", provider, e)))?;
        }
        if self.default_throttle_secs == 0 {
            Err(ConfigError::new("default_throttle_secs must be at least 1"))?;
        }
        Ok(())
    }
}
