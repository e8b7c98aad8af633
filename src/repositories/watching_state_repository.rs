// src/repositories/watching_state_repository.rs
//
// Snapshot cache of derived watching states.
// Readers may list from it, but the state machine always recomputes
// before trusting a status.

use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use super::row::{parse_text, parse_timestamp, to_count};
use crate::db::ConnectionPool;
use crate::domain::{SeriesId, UserId, WatchingState};
use crate::error::AppResult;

#[cfg_attr(test, mockall::automock)]
pub trait WatchingStateRepository: Send + Sync {
    fn save_snapshot(&self, state: &WatchingState) -> AppResult<()>;

    fn get_snapshot(&self, user_id: UserId, series_id: SeriesId)
        -> AppResult<Option<WatchingState>>;

    /// Series with a cached snapshot for the user
    fn list_tracked_series(&self, user_id: UserId) -> AppResult<Vec<SeriesId>>;
}

pub struct SqliteWatchingStateRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteWatchingStateRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_state(row: &Row) -> rusqlite::Result<WatchingState> {
        let status: String = row.get("status")?;
        let computed_at: String = row.get("computed_at")?;
        Ok(WatchingState {
            user_id: row.get("user_id")?,
            series_id: row.get("series_id")?,
            status: parse_text(2, &status)?,
            watched_count: to_count(3, row.get("watched_count")?)?,
            total_count: to_count(4, row.get("total_count")?)?,
            computed_at: parse_timestamp(5, &computed_at)?,
        })
    }
}

impl WatchingStateRepository for SqliteWatchingStateRepository {
    fn save_snapshot(&self, state: &WatchingState) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR REPLACE INTO watching_states
                (user_id, series_id, status, watched_count, total_count, computed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                state.user_id,
                state.series_id,
                state.status.to_string(),
                state.watched_count,
                state.total_count,
                state.computed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_snapshot(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> AppResult<Option<WatchingState>> {
        let conn = self.pool.get()?;
        let state = conn
            .query_row(
                "SELECT user_id, series_id, status, watched_count, total_count, computed_at
                 FROM watching_states WHERE user_id = ?1 AND series_id = ?2",
                params![user_id, series_id],
                Self::row_to_state,
            )
            .optional()?;
        Ok(state)
    }

    fn list_tracked_series(&self, user_id: UserId) -> AppResult<Vec<SeriesId>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT series_id FROM watching_states WHERE user_id = ?1 ORDER BY series_id",
        )?;
        let series = stmt
            .query_map(params![user_id], |row| row.get::<_, SeriesId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, initialize_database};
    use crate::domain::{Series, WatchingStatus};
    use crate::repositories::{CatalogRepository, SqliteCatalogRepository};

    #[test]
    fn test_snapshot_is_overwritten_per_pair() {
        let pool = Arc::new(create_memory_pool().unwrap());
        initialize_database(&pool.get().unwrap()).unwrap();
        SqliteCatalogRepository::new(Arc::clone(&pool))
            .save_series(&Series::new(1, "Show", vec![]))
            .unwrap();
        let repo = SqliteWatchingStateRepository::new(pool);

        repo.save_snapshot(&WatchingState::derive(5, 1, 2, 4)).unwrap();
        repo.save_snapshot(&WatchingState::derive(5, 1, 4, 4)).unwrap();

        let snapshot = repo.get_snapshot(5, 1).unwrap().unwrap();
        assert_eq!(snapshot.status, WatchingStatus::Finished);
        assert_eq!(snapshot.watched_count, 4);
        assert_eq!(repo.list_tracked_series(5).unwrap(), vec![1]);
        assert!(repo.get_snapshot(6, 1).unwrap().is_none());
    }
}
