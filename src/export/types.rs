//! Export types and options.

use std::path::PathBuf;

use clap::ValueEnum;

/// Export format options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Working trackers only, one per line with a blank line between entries
    Text,
    /// Complete data as pretty-printed JSON
    Json,
    /// Flattened rows for spreadsheets
    Csv,
}

/// Options for exporting data.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Output file path (or stdout if None)
    pub output: Option<PathBuf>,
    /// Export format
    pub format: ExportFormat,
}
