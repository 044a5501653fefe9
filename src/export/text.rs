//! Plain-text tracker lists.
//!
//! Trackers are written one per line with a blank line between entries, the
//! layout torrent clients expect when a list is pasted into their tracker box.

use crate::models::{ReliabilityRecord, ValidationResult};

/// Renders the working trackers of a batch, in result order.
pub fn render_working_trackers(results: &[ValidationResult]) -> String {
    join_trackers(
        results
            .iter()
            .filter(|r| r.is_alive())
            .map(|r| r.endpoint.raw()),
    )
}

/// Renders trackers whose most recent check succeeded.
pub fn render_alive_history(records: &[ReliabilityRecord]) -> String {
    join_trackers(
        records
            .iter()
            .filter(|r| r.last_alive)
            .map(|r| r.url.as_str()),
    )
}

fn join_trackers<'a>(urls: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for url in urls {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(url);
        out.push('\n');
    }
    out
}
