//! JSON documents for batches and history.

use chrono::Utc;
use serde_json::{json, Value};

use crate::models::{ReliabilityRecord, ValidationBatchStats, ValidationResult};

/// Builds the document for a finished batch: `results`, `stats`, `exported_at`.
pub fn batch_document(results: &[ValidationResult], stats: &ValidationBatchStats) -> Value {
    json!({
        "results": results,
        "stats": stats,
        "exported_at": Utc::now().to_rfc3339(),
    })
}

/// Builds the document for reliability history, with each record's rate and band.
pub fn history_document(records: &[ReliabilityRecord]) -> Value {
    let trackers: Vec<Value> = records
        .iter()
        .map(|r| {
            json!({
                "url": r.url,
                "normalized_key": r.normalized_key,
                "check_count": r.check_count,
                "success_count": r.success_count,
                "success_rate": r.success_rate(),
                "reliability": r.band().as_str(),
                "last_response_time": r.last_response_time,
                "last_checked_at": r.last_checked_at().map(|t| t.to_rfc3339()),
                "last_alive": r.last_alive,
            })
        })
        .collect();
    json!({
        "trackers": trackers,
        "exported_at": Utc::now().to_rfc3339(),
    })
}
