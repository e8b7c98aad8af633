// src/repositories/recommendation_log_repository.rs
//
// Lives on the recommendation store pool, never on the catalog pool.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use std::sync::Arc;

use super::row::parse_timestamp;
use crate::db::ConnectionPool;
use crate::domain::{RecommendationLogEntry, SeriesId, UserId};
use crate::error::AppResult;

pub trait RecommendationLogRepository: Send + Sync {
    fn create(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        watched: bool,
        recommended_at: DateTime<Utc>,
    ) -> AppResult<RecommendationLogEntry>;

    fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<RecommendationLogEntry>>;

    /// Flip every unwatched entry of the pair to watched.
    /// Returns the number of rows flipped; zero on redelivery.
    fn mark_watched(&self, user_id: UserId, series_id: SeriesId) -> AppResult<usize>;
}

pub struct SqliteRecommendationLogRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteRecommendationLogRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &Row) -> rusqlite::Result<RecommendationLogEntry> {
        let recommended_at: String = row.get("recommended_at")?;
        Ok(RecommendationLogEntry {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            series_id: row.get("series_id")?,
            recommended_at: parse_timestamp(3, &recommended_at)?,
            watched: row.get("watched")?,
        })
    }
}

impl RecommendationLogRepository for SqliteRecommendationLogRepository {
    fn create(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        watched: bool,
        recommended_at: DateTime<Utc>,
    ) -> AppResult<RecommendationLogEntry> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO recommendation_log (user_id, series_id, recommended_at, watched)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, series_id, recommended_at.to_rfc3339(), watched],
        )?;
        Ok(RecommendationLogEntry {
            id: conn.last_insert_rowid(),
            user_id,
            series_id,
            recommended_at,
            watched,
        })
    }

    fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<RecommendationLogEntry>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, series_id, recommended_at, watched FROM recommendation_log
             WHERE user_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![user_id], Self::row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn mark_watched(&self, user_id: UserId, series_id: SeriesId) -> AppResult<usize> {
        let conn = self.pool.get()?;
        let flipped = conn.execute(
            "UPDATE recommendation_log SET watched = 1
             WHERE user_id = ?1 AND series_id = ?2 AND watched = 0",
            params![user_id, series_id],
        )?;
        Ok(flipped)
    }
}
