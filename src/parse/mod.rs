//! Tracker list import.
//!
//! Turns pasted or loaded content into an ordered list of raw tracker strings
//! ready for deduplication. Supports JSON (array or `{"trackers": [...]}`),
//! CSV (first column) and free text, where URLs are picked out with a pattern.

use std::sync::LazyLock;

use clap::ValueEnum;
use log::{debug, warn};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static TRACKER_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b(https?://[^\s<>"{}|\\^`\[\]]+|udp://[^\s<>"{}|\\^`\[\]]+|magnet:\?[^\s<>"{}|\\^`\[\]]+)\b"#,
    )
    .expect("tracker url pattern")
});

/// Failure to read a tracker list in an explicitly requested format.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid JSON tracker list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON tracker list must be an array or an object with a \"trackers\" array")]
    UnexpectedJsonShape,

    #[error("Invalid CSV tracker list: {0}")]
    Csv(#[from] csv::Error),
}

/// Input format of a tracker list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ImportFormat {
    /// Detect from content
    Auto,
    /// JSON array or object with a `trackers` array
    Json,
    /// Comma-separated, tracker in the first column
    Csv,
    /// Free text; URLs are extracted
    Text,
}

/// Picks tracker URLs (http, https, udp, magnet) out of free text.
pub fn extract_trackers_from_text(text: &str) -> Vec<String> {
    TRACKER_URL
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses `content` in the given format.
///
/// `Auto` looks at the shape of the content first and falls back to text
/// extraction when the detected format does not parse. An explicit format
/// reports its parse error instead.
pub fn parse_multiple_formats(
    content: &str,
    format: ImportFormat,
) -> Result<Vec<String>, ParseError> {
    match format {
        ImportFormat::Auto => {
            let detected = detect_format(content);
            debug!("Detected tracker list format: {detected:?}");
            match parse_as(content, detected) {
                Ok(trackers) => Ok(trackers),
                Err(e) => {
                    warn!("Falling back to text extraction: {e}");
                    Ok(extract_trackers_from_text(content))
                }
            }
        }
        explicit => parse_as(content, explicit),
    }
}

fn parse_as(content: &str, format: ImportFormat) -> Result<Vec<String>, ParseError> {
    match format {
        ImportFormat::Json => parse_json(content),
        ImportFormat::Csv => parse_csv(content),
        ImportFormat::Text | ImportFormat::Auto => Ok(extract_trackers_from_text(content)),
    }
}

fn detect_format(content: &str) -> ImportFormat {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        ImportFormat::Json
    } else if content.contains('\n') && content.contains(',') {
        ImportFormat::Csv
    } else {
        ImportFormat::Text
    }
}

/// Parses a JSON tracker list. Non-string items are skipped.
pub fn parse_json(content: &str) -> Result<Vec<String>, ParseError> {
    let value: Value = serde_json::from_str(content)?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("trackers") {
            Some(Value::Array(items)) => items,
            _ => return Err(ParseError::UnexpectedJsonShape),
        },
        _ => return Err(ParseError::UnexpectedJsonShape),
    };

    Ok(items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect())
}

/// Parses a CSV tracker list, taking the first non-empty column of each row.
pub fn parse_csv(content: &str) -> Result<Vec<String>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut trackers = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(first) = record.get(0).filter(|f| !f.is_empty()) {
            trackers.push(first.to_string());
        }
    }
    Ok(trackers)
}

/// Keeps trackers containing `query` (case-insensitive); an empty query keeps all.
pub fn filter_trackers(trackers: &[String], query: &str) -> Vec<String> {
    if query.is_empty() {
        return trackers.to_vec();
    }
    let query = query.to_lowercase();
    trackers
        .iter()
        .filter(|t| t.to_lowercase().contains(&query))
        .cloned()
        .collect()
}
