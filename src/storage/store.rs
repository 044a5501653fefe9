//! Reliability store used by the validation orchestrator.
//!
//! Wraps the pool with a write circuit breaker: persistence failures are
//! logged and counted, never propagated into a running batch.

use std::time::Duration;

use log::{debug, warn};

use crate::error_handling::DatabaseError;
use crate::models::{ReliabilityRecord, ValidationResult};

use super::circuit_breaker::DbWriteCircuitBreaker;
use super::pool::DbPool;
use super::reliability::{self, BandCounts};

/// Reliability history backed by SQLite.
pub struct ReliabilityStore {
    pool: DbPool,
    breaker: DbWriteCircuitBreaker,
}

impl ReliabilityStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            breaker: DbWriteCircuitBreaker::new(),
        }
    }

    /// Uses a breaker with a custom failure threshold and cooldown.
    pub fn with_circuit_breaker(pool: DbPool, threshold: u32, cooldown: Duration) -> Self {
        Self {
            pool,
            breaker: DbWriteCircuitBreaker::with_threshold(threshold, cooldown),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Records one result, skipping the write while the circuit is open.
    pub async fn record_result(&self, result: &ValidationResult) -> Result<(), DatabaseError> {
        if self.breaker.is_circuit_open().await {
            debug!(
                "Skipping reliability write for {} (circuit open)",
                result.endpoint.raw()
            );
            return Err(DatabaseError::CircuitOpen);
        }

        match reliability::record_result(&self.pool, result).await {
            Ok(()) => {
                self.breaker.record_success().await;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Failed to record reliability for {}: {e}",
                    result.endpoint.raw()
                );
                self.breaker.record_failure().await;
                Err(e)
            }
        }
    }

    pub async fn get_record(&self, key: &str) -> Result<Option<ReliabilityRecord>, DatabaseError> {
        reliability::get_record(&self.pool, key).await
    }

    pub async fn get_history(&self, limit: u32) -> Result<Vec<ReliabilityRecord>, DatabaseError> {
        reliability::get_history(&self.pool, limit).await
    }

    pub async fn query_reliable(
        &self,
        min_success_rate: f64,
        min_checks: i64,
    ) -> Result<Vec<ReliabilityRecord>, DatabaseError> {
        reliability::query_reliable(&self.pool, min_success_rate, min_checks).await
    }

    pub async fn band_counts(&self) -> Result<BandCounts, DatabaseError> {
        reliability::band_counts(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::storage::test_helpers::create_test_pool;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_write_failures_open_circuit() {
        let pool = create_test_pool().await;
        sqlx::query("DROP TABLE tracker_reliability")
            .execute(&pool)
            .await
            .unwrap();
        let store =
            ReliabilityStore::with_circuit_breaker(Arc::new(pool), 2, Duration::from_secs(60));
        let n = Normalizer::new();
        let result = ValidationResult::alive(n.endpoint("udp://a:1"), Duration::from_millis(1));

        assert!(matches!(
            store.record_result(&result).await,
            Err(DatabaseError::SqlError(_))
        ));
        assert!(matches!(
            store.record_result(&result).await,
            Err(DatabaseError::SqlError(_))
        ));
        assert!(matches!(
            store.record_result(&result).await,
            Err(DatabaseError::CircuitOpen)
        ));
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let store = ReliabilityStore::new(Arc::new(create_test_pool().await));
        let n = Normalizer::new();
        let endpoint = n.endpoint("udp://a:1/announce");
        store
            .record_result(&ValidationResult::alive(endpoint.clone(), Duration::from_millis(3)))
            .await
            .unwrap();

        let record = store.get_record(endpoint.key()).await.unwrap().unwrap();
        assert_eq!(record.check_count, 1);
        assert_eq!(store.get_history(50).await.unwrap().len(), 1);
    }
}
