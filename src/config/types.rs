//! Configuration types and CLI option enums.
//!
//! This module defines enums and structs used for configuration, independent
//! of how they were obtained (CLI flags, settings file or code).

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::constants::{
    DB_PATH, DEFAULT_MAX_WORKERS, DEFAULT_SOCKET_TIMEOUT, DEFAULT_TIMEOUT_BUDGET, MAX_WORKERS,
    MIN_WORKERS, SETTINGS_PATH,
};
use crate::error_handling::UsageError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Numeric knobs of a validation batch.
///
/// Loaded from the settings file or the CLI and checked with [`ValidationSettings::validate`]
/// before a batch is started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Size of the worker pool (1..=50)
    pub max_workers: usize,
    /// Total time a single probe may take, retries included
    #[serde(with = "duration_secs")]
    pub timeout_budget: Duration,
    /// Wait for a single UDP reply
    #[serde(with = "duration_secs")]
    pub socket_timeout: Duration,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout_budget: DEFAULT_TIMEOUT_BUDGET,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
        }
    }
}

impl ValidationSettings {
    /// Checks the configured bounds.
    ///
    /// # Errors
    ///
    /// Returns `UsageError::InvalidConfig` when `max_workers` is outside `1..=50`
    /// or either timeout is zero.
    pub fn validate(&self) -> Result<(), UsageError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.max_workers) {
            return Err(UsageError::InvalidConfig(format!(
                "max_workers must be between {MIN_WORKERS} and {MAX_WORKERS}, got {}",
                self.max_workers
            )));
        }
        if self.timeout_budget.is_zero() {
            return Err(UsageError::InvalidConfig(
                "timeout must be positive".to_string(),
            ));
        }
        if self.socket_timeout.is_zero() {
            return Err(UsageError::InvalidConfig(
                "socket_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use tracker_status::Config;
///
/// let config = Config {
///     interface: Some("wg0".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    pub db_path: PathBuf,

    /// Settings file path (JSON)
    pub settings_path: PathBuf,

    /// Worker pool size and probe timeouts
    pub validation: ValidationSettings,

    /// Network interface probes should be bound to
    pub interface: Option<String>,

    /// Fail probes with `BindFailure` instead of falling back when binding fails
    pub require_interface: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            settings_path: PathBuf::from(SETTINGS_PATH),
            validation: ValidationSettings::default(),
            interface: None,
            require_interface: false,
        }
    }
}

/// Serializes a `Duration` as fractional seconds.
pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
