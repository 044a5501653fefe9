//! Core data model: endpoints, validation results and reliability records.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::config::{
    HIGH_RELIABILITY_THRESHOLD, MEDIUM_RELIABILITY_THRESHOLD, MIN_CHECKS_FOR_CLASSIFICATION,
};
use crate::error_handling::ProbeErrorKind;

/// Wire protocol an endpoint is reached over.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Http,
    Https,
    Udp,
    Magnet,
    Unknown,
}

impl ProtocolKind {
    /// Determines the protocol from the scheme of a raw endpoint string.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        let Some((scheme, _)) = trimmed.split_once(':') else {
            return ProtocolKind::Unknown;
        };
        match scheme.to_ascii_lowercase().as_str() {
            "http" => ProtocolKind::Http,
            "https" => ProtocolKind::Https,
            "udp" => ProtocolKind::Udp,
            "magnet" => ProtocolKind::Magnet,
            _ => ProtocolKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::Http => "http",
            ProtocolKind::Https => "https",
            ProtocolKind::Udp => "udp",
            ProtocolKind::Magnet => "magnet",
            ProtocolKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tracker reference.
///
/// Immutable once parsed. Build one with `Normalizer::endpoint`, which fills in
/// the normalized key. Not deserializable: keys only come from normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    raw: String,
    key: String,
    kind: ProtocolKind,
}

impl Endpoint {
    pub(crate) fn new(raw: impl Into<String>, key: impl Into<String>) -> Self {
        let raw = raw.into();
        let kind = ProtocolKind::from_raw(&raw);
        Self {
            raw,
            key: key.into(),
            kind,
        }
    }

    /// The endpoint exactly as it was supplied.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Canonical form used for equality, deduplication and storage.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ProtocolKind {
        self.kind
    }
}

/// What a probe concluded about an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// A valid reply arrived after `response_time_seconds`.
    Alive { response_time_seconds: f64 },
    /// The probe failed; `detail` carries the underlying message.
    Dead {
        error: ProbeErrorKind,
        detail: String,
    },
}

/// Result of probing one endpoint.
///
/// Exactly one of response time and error is populated, enforced by [`ProbeOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub endpoint: Endpoint,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn alive(endpoint: Endpoint, elapsed: Duration) -> Self {
        Self {
            endpoint,
            outcome: ProbeOutcome::Alive {
                response_time_seconds: elapsed.as_secs_f64(),
            },
            validated_at: Utc::now(),
        }
    }

    pub fn failed(endpoint: Endpoint, error: ProbeErrorKind, detail: impl Into<String>) -> Self {
        Self {
            endpoint,
            outcome: ProbeOutcome::Dead {
                error,
                detail: detail.into(),
            },
            validated_at: Utc::now(),
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Alive { .. })
    }

    pub fn response_time_seconds(&self) -> Option<f64> {
        match self.outcome {
            ProbeOutcome::Alive {
                response_time_seconds,
            } => Some(response_time_seconds),
            ProbeOutcome::Dead { .. } => None,
        }
    }

    pub fn error(&self) -> Option<ProbeErrorKind> {
        match self.outcome {
            ProbeOutcome::Alive { .. } => None,
            ProbeOutcome::Dead { error, .. } => Some(error),
        }
    }
}

/// Reliability classification of a tracker's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityBand {
    /// Success rate ≥ 0.9
    High,
    /// Success rate in [0.7, 0.9)
    Medium,
    /// Success rate < 0.7
    Low,
    /// Fewer than three checks recorded
    InsufficientData,
}

impl ReliabilityBand {
    /// Classifies a success tally.
    pub fn classify(check_count: i64, success_count: i64) -> Self {
        if check_count < MIN_CHECKS_FOR_CLASSIFICATION {
            return ReliabilityBand::InsufficientData;
        }
        let rate = success_count as f64 / check_count as f64;
        if rate >= HIGH_RELIABILITY_THRESHOLD {
            ReliabilityBand::High
        } else if rate >= MEDIUM_RELIABILITY_THRESHOLD {
            ReliabilityBand::Medium
        } else {
            ReliabilityBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReliabilityBand::High => "high",
            ReliabilityBand::Medium => "medium",
            ReliabilityBand::Low => "low",
            ReliabilityBand::InsufficientData => "insufficient data",
        }
    }
}

/// Persisted running tally for one normalized endpoint key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityRecord {
    pub normalized_key: String,
    /// Raw form of the most recently validated endpoint with this key
    pub url: String,
    pub check_count: i64,
    pub success_count: i64,
    pub last_response_time: Option<f64>,
    /// Milliseconds since the Unix epoch
    pub last_checked_at_ms: i64,
    pub last_alive: bool,
}

impl ReliabilityRecord {
    pub fn success_rate(&self) -> f64 {
        if self.check_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.check_count as f64
        }
    }

    pub fn band(&self) -> ReliabilityBand {
        ReliabilityBand::classify(self.check_count, self.success_count)
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_checked_at_ms)
    }
}

/// Counts produced by deduplication.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
}

/// Aggregate view of one batch. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationBatchStats {
    pub total: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub working_count: usize,
    pub dead_count: usize,
    pub average_response_time: f64,
    pub by_protocol: BTreeMap<ProtocolKind, usize>,
}

impl ValidationBatchStats {
    /// Stats for a deduplicated list that has not been validated yet.
    pub fn from_endpoints(dedup: DedupStats, endpoints: &[Endpoint]) -> Self {
        let mut by_protocol = BTreeMap::new();
        for endpoint in endpoints {
            *by_protocol.entry(endpoint.kind()).or_insert(0) += 1;
        }
        Self {
            total: dedup.total,
            unique: dedup.unique,
            duplicates: dedup.duplicates,
            by_protocol,
            ..Default::default()
        }
    }

    /// Recomputes the aggregate from the results of a batch.
    pub fn from_results(dedup: DedupStats, results: &[ValidationResult]) -> Self {
        let mut by_protocol = BTreeMap::new();
        let mut working_count = 0;
        let mut response_time_sum = 0.0;
        for result in results {
            *by_protocol.entry(result.endpoint.kind()).or_insert(0) += 1;
            if let Some(rt) = result.response_time_seconds() {
                working_count += 1;
                response_time_sum += rt;
            }
        }
        let average_response_time = if working_count > 0 {
            response_time_sum / working_count as f64
        } else {
            0.0
        };
        Self {
            total: dedup.total,
            unique: dedup.unique,
            duplicates: dedup.duplicates,
            working_count,
            dead_count: results.len() - working_count,
            average_response_time,
            by_protocol,
        }
    }
}
