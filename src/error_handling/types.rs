//! Error type definitions.
//!
//! This module defines the per-endpoint failure taxonomy and the error types
//! reported synchronously to callers.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Writes are paused after repeated failures.
    #[error("Database writes paused by circuit breaker")]
    CircuitOpen,
}

/// Misuse of the engine, reported to the caller instead of being folded into results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// `start` was called while another batch is still running.
    #[error("A validation batch is already running")]
    BatchAlreadyRunning,

    /// Configuration values are out of bounds.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The batch contained no usable tracker references.
    #[error("No tracker endpoints to validate")]
    NoEndpoints,
}

/// Why a probe did not report an endpoint alive.
///
/// Surfaced per endpoint in `ValidationResult`; never raised across the
/// orchestrator boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Serialize, Deserialize,
)]
pub enum ProbeErrorKind {
    /// The time budget expired before a usable reply arrived.
    Timeout,
    /// The remote host actively refused the connection.
    ConnectionRefused,
    /// The tracker host name could not be resolved.
    DnsResolutionFailed,
    /// A reply arrived but was malformed or did not match the request.
    ProtocolMismatch,
    /// The endpoint's scheme has no probe.
    UnsupportedScheme,
    /// Binding to the required network interface failed.
    BindFailure,
    /// Any other I/O fault.
    Unknown,
}

impl std::fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProbeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeErrorKind::Timeout => "Timeout",
            ProbeErrorKind::ConnectionRefused => "ConnectionRefused",
            ProbeErrorKind::DnsResolutionFailed => "DnsResolutionFailed",
            ProbeErrorKind::ProtocolMismatch => "ProtocolMismatch",
            ProbeErrorKind::UnsupportedScheme => "UnsupportedScheme",
            ProbeErrorKind::BindFailure => "BindFailure",
            ProbeErrorKind::Unknown => "Unknown",
        }
    }

    /// Human-readable description used in summaries.
    pub fn description(&self) -> &'static str {
        match self {
            ProbeErrorKind::Timeout => "Timed out",
            ProbeErrorKind::ConnectionRefused => "Connection refused",
            ProbeErrorKind::DnsResolutionFailed => "DNS resolution failed",
            ProbeErrorKind::ProtocolMismatch => "Protocol mismatch",
            ProbeErrorKind::UnsupportedScheme => "Unsupported scheme",
            ProbeErrorKind::BindFailure => "Interface binding failed",
            ProbeErrorKind::Unknown => "Unknown error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_probe_error_kind_display_matches_as_str() {
        for kind in ProbeErrorKind::iter() {
            assert_eq!(kind.to_string(), kind.as_str());
            assert!(!kind.description().is_empty());
        }
    }

    #[test]
    fn test_probe_error_kind_serializes_as_name() {
        let json = serde_json::to_string(&ProbeErrorKind::ProtocolMismatch).unwrap();
        assert_eq!(json, "\"ProtocolMismatch\"");
    }

    #[test]
    fn test_usage_error_messages() {
        assert_eq!(
            UsageError::BatchAlreadyRunning.to_string(),
            "A validation batch is already running"
        );
        assert!(UsageError::InvalidConfig("max_workers".into())
            .to_string()
            .contains("max_workers"));
    }
}
