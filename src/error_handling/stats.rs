//! Probe failure statistics.
//!
//! Thread-safe counters per failure kind, shared by all workers of a batch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::ProbeErrorKind;

/// Thread-safe processing statistics tracker.
///
/// Tracks probe failures using atomic counters, allowing concurrent access from
/// multiple tasks. All kinds are initialized to zero on creation.
pub struct ProcessingStats {
    errors: HashMap<ProbeErrorKind, AtomicUsize>,
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for kind in ProbeErrorKind::iter() {
            errors.insert(kind, AtomicUsize::new(0));
        }
        ProcessingStats { errors }
    }

    /// Increment an error counter.
    pub fn increment_error(&self, kind: ProbeErrorKind) {
        if let Some(counter) = self.errors.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment error counter for {:?} which is not in the map. \
                 This indicates a bug in ProcessingStats initialization.",
                kind
            );
        }
    }

    /// Get the count for an error kind.
    pub fn get_error_count(&self, kind: ProbeErrorKind) -> usize {
        self.errors
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total failures across all kinds.
    pub fn total_errors(&self) -> usize {
        self.errors.values().map(|c| c.load(Ordering::SeqCst)).sum()
    }

    /// Non-zero counts in taxonomy order.
    pub fn snapshot(&self) -> Vec<(ProbeErrorKind, usize)> {
        ProbeErrorKind::iter()
            .map(|kind| (kind, self.get_error_count(kind)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}
