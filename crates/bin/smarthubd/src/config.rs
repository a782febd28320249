//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `smarthub.toml` in the working directory, or at the path named
//! by `SMARTHUB_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use smarthub_app::registry::{DEFAULT_HEALTH_CHECK_PERIOD, DEFAULT_MAX_TRIGGER_CASCADE};
use smarthub_app::retry::RetryPolicy;
use smarthub_domain::device::{DeviceCommand, DeviceSpec};
use smarthub_domain::id::DeviceId;
use smarthub_domain::time::TimeOfDay;
use smarthub_domain::trigger::{Condition, Operator};

const DEFAULT_PATH: &str = "smarthub.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Hub-wide behaviour.
    pub hub: HubConfig,
    /// Retry policy applied to every command.
    pub retry: RetryConfig,
    /// Devices registered at startup.
    pub devices: Vec<DeviceSpec>,
    /// Standing trigger rules.
    pub triggers: Vec<TriggerConfig>,
    /// Daily device commands.
    pub schedules: Vec<ScheduleConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Hub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Period of the background health check, in seconds.
    pub health_check_secs: u64,
    /// Minimum interval between two calls to the same device, in milliseconds.
    pub throttle_ms: u64,
    /// How many trigger-issued commands may chain before evaluation stops.
    pub max_trigger_cascade: u32,
}

/// Retry configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
}

/// A trigger that sends `command` to `device_id` when the condition holds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TriggerConfig {
    pub metric: String,
    pub operator: Operator,
    pub threshold: f64,
    pub device_id: DeviceId,
    pub command: DeviceCommand,
}

impl TriggerConfig {
    #[must_use]
    pub fn condition(&self) -> Condition {
        Condition::new(self.metric.clone(), self.operator, self.threshold)
    }
}

/// A device command run every day at `at` (`HH:MM`, local time).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScheduleConfig {
    pub device_id: DeviceId,
    pub at: TimeOfDay,
    pub command: DeviceCommand,
}

impl Config {
    /// Load configuration from `smarthub.toml` (or `SMARTHUB_CONFIG`) if
    /// present, then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SMARTHUB_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => content.parse(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SMARTHUB_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check the semantic constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub.health_check_secs == 0 {
            return Err(ConfigError::Validation(
                "hub.health_check_secs must be non-zero".to_string(),
            ));
        }
        if self.hub.max_trigger_cascade == 0 {
            return Err(ConfigError::Validation(
                "hub.max_trigger_cascade must be at least 1".to_string(),
            ));
        }
        self.retry_policy()?;

        let mut seen = BTreeSet::new();
        for spec in &self.devices {
            if !seen.insert(spec.id) {
                return Err(ConfigError::Validation(format!(
                    "device {} is declared more than once",
                    spec.id
                )));
            }
            spec.kind()
                .map_err(|err| ConfigError::Validation(format!("device {}: {err}", spec.id)))?;
        }
        Ok(())
    }

    /// The retry policy described by `[retry]`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for zero attempts or an unusable
    /// multiplier.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            self.retry.multiplier,
        )
        .map_err(|err| ConfigError::Validation(format!("retry: {err}")))
    }

    #[must_use]
    pub fn health_check_period(&self) -> Duration {
        Duration::from_secs(self.hub.health_check_secs)
    }

    #[must_use]
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.hub.throttle_ms)
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "smarthubd=info,smarthub=info".to_string(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            health_check_secs: DEFAULT_HEALTH_CHECK_PERIOD.as_secs(),
            throttle_ms: 50,
            max_trigger_cascade: DEFAULT_MAX_TRIGGER_CASCADE,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts(),
            base_delay_ms: u64::try_from(policy.base_delay().as_millis()).unwrap_or(u64::MAX),
            multiplier: policy.multiplier(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
