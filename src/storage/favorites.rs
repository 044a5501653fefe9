//! Favorite trackers, keyed like every other lookup by normalized key.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::ReliabilityRecord;

use super::reliability::get_record;

/// A favorited tracker with its reliability record, if it was ever checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Favorite {
    pub normalized_key: String,
    pub url: String,
    pub note: Option<String>,
    pub added_at: DateTime<Utc>,
    pub reliability: Option<ReliabilityRecord>,
}

/// Adds or replaces a favorite.
pub async fn add_favorite(
    pool: &SqlitePool,
    normalized_key: &str,
    url: &str,
    note: Option<&str>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO tracker_favorites (normalized_key, url, note, added_at_ms)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(normalized_key) DO UPDATE SET
             url = excluded.url,
             note = excluded.note",
    )
    .bind(normalized_key)
    .bind(url)
    .bind(note)
    .bind(Utc::now().timestamp_millis())
    .execute(pool)
    .await?;
    Ok(())
}

/// Removes a favorite. Returns whether one existed.
pub async fn remove_favorite(
    pool: &SqlitePool,
    normalized_key: &str,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM tracker_favorites WHERE normalized_key = ?")
        .bind(normalized_key)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// All favorites, most recently added first.
pub async fn list_favorites(pool: &SqlitePool) -> Result<Vec<Favorite>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT normalized_key, url, note, added_at_ms FROM tracker_favorites
         ORDER BY added_at_ms DESC, normalized_key ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut favorites = Vec::with_capacity(rows.len());
    for row in rows {
        let normalized_key: String = row.try_get("normalized_key")?;
        let added_at_ms: i64 = row.try_get("added_at_ms")?;
        let reliability = get_record(pool, &normalized_key).await?;
        favorites.push(Favorite {
            url: row.try_get("url")?,
            note: row.try_get("note")?,
            added_at: DateTime::from_timestamp_millis(added_at_ms).unwrap_or_default(),
            normalized_key,
            reliability,
        });
    }
    Ok(favorites)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ValidationResult;
    use crate::normalize::Normalizer;
    use crate::storage::record_result;
    use crate::storage::test_helpers::create_test_pool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_add_list_remove() {
        let pool = create_test_pool().await;
        add_favorite(&pool, "udp://a:1/announce", "udp://A:1/announce", Some("fast"))
            .await
            .unwrap();

        let favorites = list_favorites(&pool).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].url, "udp://A:1/announce");
        assert_eq!(favorites[0].note.as_deref(), Some("fast"));
        assert!(favorites[0].reliability.is_none());

        assert!(remove_favorite(&pool, "udp://a:1/announce").await.unwrap());
        assert!(!remove_favorite(&pool, "udp://a:1/announce").await.unwrap());
        assert!(list_favorites(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorite_joins_reliability() {
        let pool = create_test_pool().await;
        let n = Normalizer::new();
        let endpoint = n.endpoint("udp://a:1/announce");
        record_result(
            &pool,
            &ValidationResult::alive(endpoint.clone(), Duration::from_millis(10)),
        )
        .await
        .unwrap();
        add_favorite(&pool, endpoint.key(), endpoint.raw(), None)
            .await
            .unwrap();

        let favorites = list_favorites(&pool).await.unwrap();
        let record = favorites[0].reliability.as_ref().expect("joined record");
        assert_eq!(record.check_count, 1);
    }
}
