//! Shared configuration for the plotline host and its plugin subsystem.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then
//! configuration files, then `PLOTLINE_*` environment variables, then command
//! line flags. Path settings are optional in the layered form and resolve to
//! platform defaults through the accessor methods, so an unset value always
//! tracks the current executable location.

mod defaults;
mod logging;
mod policy;

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::defaults::{
    APPLICATION_DIR, DEFAULT_LOG_FILTER, DEFAULT_VALIDATION_TIMEOUT_MS, PLUGIN_DIR_NAME,
    REGISTRY_FILE_NAME, VALIDATOR_BINARY_NAME, default_log_filter, default_log_filter_string,
    default_log_format, default_missing_validator, default_plugin_dir, default_registry_path,
    default_validation_timeout, default_validation_timeout_ms, default_validator_path,
    executable_directory,
};
pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::policy::{MissingValidatorPolicy, MissingValidatorPolicyParseError};

/// Layered configuration shared by the `plotline` binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PLOTLINE")]
pub struct Config {
    /// `tracing` filter directive applied to the host's log output.
    #[ortho_config(default = default_log_filter_string())]
    #[serde(default = "default_log_filter_string")]
    log_filter: String,
    /// Log line format.
    #[ortho_config(default = default_log_format())]
    #[serde(default = "default_log_format")]
    log_format: LogFormat,
    /// Persisted plugin list; defaults to `<config dir>/plotline/plugins.json`.
    #[serde(default)]
    registry_path: Option<Utf8PathBuf>,
    /// Directory holding the bundled default plugins.
    #[serde(default)]
    plugin_dir: Option<Utf8PathBuf>,
    /// Validator executable; defaults to the binary next to the host.
    #[serde(default)]
    validator_path: Option<Utf8PathBuf>,
    /// Wall-clock budget for one validator run, in milliseconds.
    #[ortho_config(default = default_validation_timeout_ms())]
    #[serde(default = "default_validation_timeout_ms")]
    validation_timeout_ms: u64,
    /// Behaviour when the validator executable cannot be launched.
    #[ortho_config(default = default_missing_validator())]
    #[serde(default = "default_missing_validator")]
    missing_validator: MissingValidatorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            registry_path: None,
            plugin_dir: None,
            validator_path: None,
            validation_timeout_ms: default_validation_timeout_ms(),
            missing_validator: default_missing_validator(),
        }
    }
}

impl Config {
    /// Returns the configured log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the persisted plugin list location.
    #[must_use]
    pub fn registry_path(&self) -> Utf8PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(default_registry_path)
    }

    /// Returns the directory holding the bundled plugins.
    #[must_use]
    pub fn plugin_dir(&self) -> Utf8PathBuf {
        self.plugin_dir.clone().unwrap_or_else(default_plugin_dir)
    }

    /// Returns the validator executable location.
    #[must_use]
    pub fn validator_path(&self) -> Utf8PathBuf {
        self.validator_path
            .clone()
            .unwrap_or_else(default_validator_path)
    }

    /// Returns the per-run validation timeout.
    #[must_use]
    pub const fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }

    /// Returns the policy applied when the validator cannot be launched.
    #[must_use]
    pub const fn missing_validator(&self) -> MissingValidatorPolicy {
        self.missing_validator
    }

    /// Overrides the persisted plugin list location.
    #[must_use]
    pub fn with_registry_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    /// Overrides the bundled plugin directory.
    #[must_use]
    pub fn with_plugin_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.plugin_dir = Some(path.into());
        self
    }

    /// Overrides the validator executable location.
    #[must_use]
    pub fn with_validator_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.validator_path = Some(path.into());
        self
    }

    /// Overrides the validation timeout.
    #[must_use]
    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Overrides the missing-validator policy.
    #[must_use]
    pub const fn with_missing_validator(mut self, policy: MissingValidatorPolicy) -> Self {
        self.missing_validator = policy;
        self
    }

    /// Checks cross-field constraints that the layered loader cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validation_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::EmptyLogFilter);
        }
        Ok(())
    }
}

/// Semantic errors in an otherwise well-formed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A zero timeout would fail every validation.
    #[error("validation_timeout_ms must be greater than zero")]
    ZeroTimeout,
    /// The log filter was blank.
    #[error("log_filter must not be empty")]
    EmptyLogFilter,
}
