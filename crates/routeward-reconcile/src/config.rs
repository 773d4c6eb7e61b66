//! Reconciler configuration
//!
//! Timeout budgets and retry backoff, with presets and an optional TOML
//! loader:
//!
//! ```toml
//! create_timeout_secs = 120
//! delete_timeout_secs = 300
//!
//! [backoff]
//! initial_delay_ms = 100
//! max_delay_ms = 10000
//! multiplier = 2.0
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Largest accepted create or delete budget
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors loading a reconciler configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading \"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing reconciler config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Delay growth between retry attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first retryable failure
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Growth factor applied after each retry
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Constant delay between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// The delay following `current`, capped at `max_delay`
    pub fn next_delay(&self, current: Duration) -> Duration {
        let scaled = (current.as_nanos() as f64 * self.multiplier).round();
        if !scaled.is_finite() || scaled >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(scaled as u64)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff.multiplier",
                reason: format!("must be a finite number >= 1.0, got {}", self.multiplier),
            });
        }
        if self.initial_delay.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "backoff.initial_delay_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.initial_delay > self.max_delay {
            return Err(ConfigError::InvalidValue {
                field: "backoff.max_delay_ms",
                reason: format!(
                    "must not be below initial_delay_ms ({}ms < {}ms)",
                    self.max_delay.as_millis(),
                    self.initial_delay.as_millis()
                ),
            });
        }
        Ok(())
    }
}

/// Reconciler timeouts and retry behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilerConfig {
    /// Budget shared by the create call and its confirmation lookups
    pub create_timeout: Duration,
    /// Budget for delete
    pub delete_timeout: Duration,
    /// Delay growth between attempts
    pub backoff: BackoffConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            create_timeout: Duration::from_secs(120),
            delete_timeout: Duration::from_secs(300),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Create a config optimized for tests
    ///
    /// Uses short budgets and a fixed 10ms delay.
    pub fn testing() -> Self {
        Self {
            create_timeout: Duration::from_secs(2),
            delete_timeout: Duration::from_secs(5),
            backoff: BackoffConfig::fixed(Duration::from_millis(10)),
        }
    }

    /// Set the create budget
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    /// Set the delete budget
    pub fn with_delete_timeout(mut self, timeout: Duration) -> Self {
        self.delete_timeout = timeout;
        self
    }

    /// Set the backoff
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Parse a TOML document, filling missing keys with defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;
        let defaults = Self::default();
        let backoff = raw.backoff.unwrap_or_default();

        let config = Self {
            create_timeout: raw
                .create_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.create_timeout),
            delete_timeout: raw
                .delete_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.delete_timeout),
            backoff: BackoffConfig {
                initial_delay: backoff
                    .initial_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.backoff.initial_delay),
                max_delay: backoff
                    .max_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.backoff.max_delay),
                multiplier: backoff.multiplier.unwrap_or(defaults.backoff.multiplier),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check configuration invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout("create_timeout_secs", self.create_timeout)?;
        check_timeout("delete_timeout_secs", self.delete_timeout)?;
        self.backoff.validate()
    }
}

fn check_timeout(field: &'static str, timeout: Duration) -> Result<(), ConfigError> {
    if timeout.is_zero() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    if timeout > MAX_TIMEOUT {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!(
                "must be at most {}s, got {}s",
                MAX_TIMEOUT.as_secs(),
                timeout.as_secs()
            ),
        });
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    create_timeout_secs: Option<u64>,
    delete_timeout_secs: Option<u64>,
    backoff: Option<RawBackoff>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBackoff {
    initial_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    multiplier: Option<f64>,
}
