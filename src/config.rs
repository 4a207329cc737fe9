//! Collector configuration.
//!
//! Every field has a default, so a TOML document only needs the keys it
//! changes:
//!
//! ```toml
//! buffer_capacity_per_platform = 50000
//! remote_timeout_ms = 2000
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Collector settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Records retained per platform before the oldest are evicted.
    pub buffer_capacity_per_platform: usize,
    /// Overview limit used when the caller supplies none.
    pub default_overview_limit: usize,
    /// Records scanned between cancellation polls.
    pub cancellation_check_interval: usize,
    /// Per-call timeout of remote operations, in milliseconds.
    pub remote_timeout_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity_per_platform: invoscope_storage::DEFAULT_CAPACITY_PER_PLATFORM,
            default_overview_limit: 50,
            cancellation_check_interval: invoscope_engine::DEFAULT_CHECK_INTERVAL,
            remote_timeout_ms: 5_000,
        }
    }
}

impl CollectorConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject settings the collector cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity_per_platform == 0 {
            return Err(ConfigError::Invalid(
                "buffer_capacity_per_platform must be at least 1".into(),
            ));
        }
        if self.cancellation_check_interval == 0 {
            return Err(ConfigError::Invalid(
                "cancellation_check_interval must be at least 1".into(),
            ));
        }
        if self.remote_timeout_ms == 0 {
            return Err(ConfigError::Invalid("remote_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }

    /// Remote call timeout as a [`Duration`].
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}
