// src/repositories/rating_repository.rs

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use super::row::{parse_timestamp, to_count};
use crate::db::ConnectionPool;
use crate::domain::{Rating, SeriesId, UserId};
use crate::error::{AppError, AppResult};

#[cfg_attr(test, mockall::automock)]
pub trait RatingRepository: Send + Sync {
    /// Insert or overwrite the single rating of (user, series).
    /// `created_at` of an existing row is preserved.
    fn upsert(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        score: i32,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Rating>;

    fn get(&self, user_id: UserId, series_id: SeriesId) -> AppResult<Option<Rating>>;

    fn count_for_user(&self, user_id: UserId) -> AppResult<u32>;
}

pub struct SqliteRatingRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteRatingRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_rating(row: &Row) -> rusqlite::Result<Rating> {
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        Ok(Rating {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            series_id: row.get("series_id")?,
            score: row.get("score")?,
            comment: row.get("comment")?,
            created_at: parse_timestamp(5, &created_at)?,
            updated_at: parse_timestamp(6, &updated_at)?,
        })
    }
}

const SELECT_RATING: &str = "SELECT id, user_id, series_id, score, comment, created_at, updated_at
     FROM ratings WHERE user_id = ?1 AND series_id = ?2";

impl RatingRepository for SqliteRatingRepository {
    fn upsert(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        score: i32,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Rating> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO ratings (user_id, series_id, score, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(user_id, series_id) DO UPDATE SET
                score = excluded.score,
                comment = excluded.comment,
                updated_at = excluded.updated_at",
            params![user_id, series_id, score, comment, now.to_rfc3339()],
        )?;

        let rating = tx
            .query_row(SELECT_RATING, params![user_id, series_id], Self::row_to_rating)
            .optional()?
            .ok_or(AppError::NotFound)?;

        tx.commit()?;
        Ok(rating)
    }

    fn get(&self, user_id: UserId, series_id: SeriesId) -> AppResult<Option<Rating>> {
        let conn = self.pool.get()?;
        let rating = conn
            .query_row(SELECT_RATING, params![user_id, series_id], Self::row_to_rating)
            .optional()?;
        Ok(rating)
    }

    fn count_for_user(&self, user_id: UserId) -> AppResult<u32> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT series_id) FROM ratings WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(to_count(0, count)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, initialize_database};
    use crate::domain::Series;
    use crate::repositories::{CatalogRepository, SqliteCatalogRepository};
    use chrono::Duration;

    fn repo() -> SqliteRatingRepository {
        let pool = Arc::new(create_memory_pool().unwrap());
        initialize_database(&pool.get().unwrap()).unwrap();
        let catalog = SqliteCatalogRepository::new(Arc::clone(&pool));
        catalog.save_series(&Series::new(1, "One", vec![])).unwrap();
        catalog.save_series(&Series::new(2, "Two", vec![])).unwrap();
        SqliteRatingRepository::new(pool)
    }

    #[test]
    fn test_upsert_overwrites_instead_of_duplicating() {
        let repo = repo();
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(1);

        let first = repo.upsert(3, 1, 9, Some("great".to_string()), t0).unwrap();
        let second = repo.upsert(3, 1, 7, None, t1).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.score, 7);
        assert_eq!(second.comment, None);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(repo.count_for_user(3).unwrap(), 1);
    }

    #[test]
    fn test_count_is_per_user() {
        let repo = repo();
        let now = Utc::now();
        repo.upsert(3, 1, 9, None, now).unwrap();
        repo.upsert(3, 2, 5, None, now).unwrap();
        repo.upsert(4, 1, 8, None, now).unwrap();

        assert_eq!(repo.count_for_user(3).unwrap(), 2);
        assert_eq!(repo.count_for_user(4).unwrap(), 1);
        assert!(repo.get(5, 1).unwrap().is_none());
    }
}
