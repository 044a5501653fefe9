//! Summaries printed at the end of a run.

use log::info;

use crate::models::ValidationBatchStats;
use crate::storage::BandCounts;
use crate::validation::{BatchOutcome, BatchState};

/// Logs the one-line result of a batch followed by its failure breakdown.
pub fn print_batch_summary(outcome: &BatchOutcome) {
    let elapsed = outcome.elapsed.as_secs_f64();
    match outcome.state {
        BatchState::Stopped => info!(
            "Stopped after {}/{} trackers: {} working ({:.1}s)",
            outcome.results.len(),
            outcome.total,
            outcome.working,
            elapsed
        ),
        _ => info!(
            "Validation complete: {}/{} working ({:.1}s)",
            outcome.working, outcome.total, elapsed
        ),
    }
    print_error_statistics(outcome);
}

/// Logs failure counts by kind, if there were any.
pub fn print_error_statistics(outcome: &BatchOutcome) {
    let failed: usize = outcome.error_counts.iter().map(|(_, count)| count).sum();
    if failed == 0 {
        return;
    }
    info!("Failures ({failed} total):");
    for (kind, count) in &outcome.error_counts {
        info!("   {}: {count}", kind.description());
    }
}

/// Logs deduplication counts and the protocol mix.
pub fn print_dedup_summary(stats: &ValidationBatchStats) {
    info!(
        "{} trackers, {} unique, {} duplicates",
        stats.total, stats.unique, stats.duplicates
    );
    for (protocol, count) in &stats.by_protocol {
        info!("   {protocol}: {count}");
    }
}

/// Logs how many stored trackers fall in each reliability band.
pub fn print_reliability_report(counts: &BandCounts) {
    info!(
        "Reliability: {} high, {} medium, {} low ({} with insufficient data)",
        counts.high, counts.medium, counts.low, counts.insufficient_data
    );
}
