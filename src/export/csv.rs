//! CSV export functionality.
//!
//! One row per tracker, flattened for spreadsheets.

use anyhow::Result;
use csv::Writer;
use std::io::Write;

use crate::models::{ReliabilityRecord, ValidationResult};

/// Writes batch results as CSV rows. Returns the number of rows written.
pub fn write_results_csv<W: Write>(writer: W, results: &[ValidationResult]) -> Result<usize> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record([
        "url",
        "protocol",
        "status",
        "response_time_seconds",
        "error",
        "validated_at",
    ])?;

    for result in results {
        let response_time = result
            .response_time_seconds()
            .map(|rt| format!("{rt:.3}"))
            .unwrap_or_default();
        let error = result.error().map(|e| e.as_str()).unwrap_or_default();
        let validated_at = result.validated_at.to_rfc3339();
        csv_writer.write_record([
            result.endpoint.raw(),
            result.endpoint.kind().as_str(),
            if result.is_alive() { "alive" } else { "dead" },
            response_time.as_str(),
            error,
            validated_at.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(results.len())
}

/// Writes reliability records as CSV rows. Returns the number of rows written.
pub fn write_history_csv<W: Write>(writer: W, records: &[ReliabilityRecord]) -> Result<usize> {
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record([
        "url",
        "check_count",
        "success_count",
        "success_rate",
        "reliability",
        "last_response_time",
        "last_checked_at",
        "last_alive",
    ])?;

    for record in records {
        let last_response_time = record
            .last_response_time
            .map(|rt| format!("{rt:.3}"))
            .unwrap_or_default();
        let last_checked = record
            .last_checked_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        let check_count = record.check_count.to_string();
        let success_count = record.success_count.to_string();
        let success_rate = format!("{:.3}", record.success_rate());
        csv_writer.write_record([
            record.url.as_str(),
            check_count.as_str(),
            success_count.as_str(),
            success_rate.as_str(),
            record.band().as_str(),
            last_response_time.as_str(),
            last_checked.as_str(),
            if record.last_alive { "true" } else { "false" },
        ])?;
    }

    csv_writer.flush()?;
    Ok(records.len())
}
