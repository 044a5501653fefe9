//! Export functionality for validation results and reliability history.
//!
//! Batches can be written as a plain list of working trackers, a JSON
//! document or CSV rows; stored history supports the same three formats.

mod csv;
mod json;
mod queries;
mod text;
mod types;

use anyhow::{Context, Result};
use std::io::Write;

use crate::models::{ReliabilityRecord, ValidationBatchStats, ValidationResult};

pub use self::csv::{write_history_csv, write_results_csv};
pub use json::{batch_document, history_document};
pub use text::{render_alive_history, render_working_trackers};
pub use types::{ExportFormat, ExportOptions};

/// Exports the results of one batch. Returns the number of trackers written.
pub async fn export_results(
    opts: &ExportOptions,
    results: &[ValidationResult],
    stats: &ValidationBatchStats,
) -> Result<usize> {
    let mut writer = queries::open_output(opts.output.as_deref()).await?;

    let count = match opts.format {
        ExportFormat::Text => {
            writer.write_all(render_working_trackers(results).as_bytes())?;
            results.iter().filter(|r| r.is_alive()).count()
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &batch_document(results, stats))
                .context("Failed to serialize batch")?;
            writer.write_all(b"\n")?;
            results.len()
        }
        ExportFormat::Csv => write_results_csv(&mut writer, results)?,
    };

    writer.flush().context("Failed to flush export output")?;
    Ok(count)
}

/// Exports stored reliability history. Returns the number of trackers written.
pub async fn export_history(opts: &ExportOptions, records: &[ReliabilityRecord]) -> Result<usize> {
    let mut writer = queries::open_output(opts.output.as_deref()).await?;

    let count = match opts.format {
        ExportFormat::Text => {
            writer.write_all(render_alive_history(records).as_bytes())?;
            records.iter().filter(|r| r.last_alive).count()
        }
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &history_document(records))
                .context("Failed to serialize history")?;
            writer.write_all(b"\n")?;
            records.len()
        }
        ExportFormat::Csv => write_history_csv(&mut writer, records)?,
    };

    writer.flush().context("Failed to flush export output")?;
    Ok(count)
}
