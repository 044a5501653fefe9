//! Circuit breaker for reliability writes.
//!
//! After a run of consecutive write failures the circuit opens and writes are
//! skipped until a cooldown expires; the next write then probes the database
//! again and either closes the circuit or reopens it for another cooldown.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::config::{DB_WRITE_COOLDOWN, DB_WRITE_FAILURE_THRESHOLD};

/// Consecutive-failure breaker guarding database writes.
pub struct DbWriteCircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    /// Set while the circuit is open
    opened_at: RwLock<Option<Instant>>,
}

impl DbWriteCircuitBreaker {
    /// Opens after 5 consecutive failures, with a 60 second cooldown.
    pub fn new() -> Self {
        Self::with_threshold(DB_WRITE_FAILURE_THRESHOLD, DB_WRITE_COOLDOWN)
    }

    pub fn with_threshold(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            opened_at: RwLock::new(None),
        }
    }

    /// Resets the failure count and closes the circuit.
    pub async fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let mut opened_at = self.opened_at.write().await;
        if opened_at.take().is_some() {
            log::info!("Reliability write circuit closed after a successful write");
        }
    }

    /// Counts a failure, opening (or re-arming) the circuit at the threshold.
    pub async fn record_failure(&self) {
        let count = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if count < self.failure_threshold {
            return;
        }

        let mut opened_at = self.opened_at.write().await;
        if opened_at.is_none() {
            log::error!(
                "Reliability write circuit opened after {count} consecutive failures (cooldown: {}s)",
                self.cooldown.as_secs()
            );
        }
        *opened_at = Some(Instant::now());
    }

    /// Whether writes should be skipped right now.
    ///
    /// Once the cooldown has expired this returns `false` so one write can
    /// test the database again.
    pub async fn is_circuit_open(&self) -> bool {
        match *self.opened_at.read().await {
            Some(opened) => opened.elapsed() < self.cooldown,
            None => false,
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }
}

impl Default for DbWriteCircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_opens_after_threshold() {
        let cb = DbWriteCircuitBreaker::with_threshold(3, Duration::from_secs(60));

        cb.record_failure().await;
        cb.record_failure().await;
        assert!(!cb.is_circuit_open().await);
        assert_eq!(cb.failure_count(), 2);

        cb.record_failure().await;
        assert!(cb.is_circuit_open().await);
    }

    #[tokio::test]
    async fn test_success_resets() {
        let cb = DbWriteCircuitBreaker::with_threshold(2, Duration::from_secs(60));
        cb.record_failure().await;
        cb.record_failure().await;
        assert!(cb.is_circuit_open().await);

        cb.record_success().await;
        assert_eq!(cb.failure_count(), 0);
        assert!(!cb.is_circuit_open().await);
    }

    #[tokio::test]
    async fn test_cooldown_allows_probe_and_failure_rearms() {
        let cb = DbWriteCircuitBreaker::with_threshold(2, Duration::from_millis(50));
        cb.record_failure().await;
        cb.record_failure().await;
        assert!(cb.is_circuit_open().await);

        sleep(Duration::from_millis(60)).await;
        assert!(!cb.is_circuit_open().await);

        // The probing write fails again
        cb.record_failure().await;
        assert!(cb.is_circuit_open().await);
    }
}
