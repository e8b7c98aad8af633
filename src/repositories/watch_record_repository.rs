// src/repositories/watch_record_repository.rs
//
// Watch Record Repository
//
// Every write goes through `commit`, which is the pre-commit hook:
// the batch is rewritten by IncompleteRecordGuard and applied in one
// transaction. Single-row and bulk callers share this path.

use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use super::row::{parse_timestamp, to_count};
use crate::db::ConnectionPool;
use crate::domain::{
    EpisodeId, GuardedWrite, IncompleteRecordGuard, SeriesId, UserId, WatchRecord,
    WatchRecordWrite,
};
use crate::error::AppResult;

/// What a commit actually changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Rows that did not exist before
    pub inserted: Vec<(UserId, EpisodeId)>,
    /// Existing rows overwritten
    pub replaced: usize,
    /// Rows removed (explicit deletes and guarded updates)
    pub deleted: Vec<(UserId, EpisodeId)>,
}

// ---------------------------------------------------------------------
// Repository contract
// ---------------------------------------------------------------------
#[cfg_attr(test, mockall::automock)]
pub trait WatchRecordRepository: Send + Sync {
    /// Apply a batch of writes atomically, after the guard rewrote them
    fn commit(&self, writes: Vec<WatchRecordWrite>) -> AppResult<CommitSummary>;

    fn get(&self, user_id: UserId, episode_id: EpisodeId) -> AppResult<Option<WatchRecord>>;

    /// Watched episodes of the series' current episode set
    fn count_for_series(&self, user_id: UserId, series_id: SeriesId) -> AppResult<u32>;

    /// All watch records of the user
    fn count_for_user(&self, user_id: UserId) -> AppResult<u32>;

    /// Series in which the user watched at least one episode
    fn list_watched_series(&self, user_id: UserId) -> AppResult<Vec<SeriesId>>;
}

pub struct SqliteWatchRecordRepository {
    pool: Arc<ConnectionPool>,
    guard: IncompleteRecordGuard,
}

impl SqliteWatchRecordRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            pool,
            guard: IncompleteRecordGuard,
        }
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<WatchRecord> {
        let watched_at: String = row.get("watched_at")?;
        Ok(WatchRecord {
            user_id: row.get("user_id")?,
            episode_id: row.get("episode_id")?,
            watched_at: parse_timestamp(2, &watched_at)?,
            completed: row.get("completed")?,
        })
    }
}

// ---------------------------------------------------------------------
// SQLite Implementation
// ---------------------------------------------------------------------
impl WatchRecordRepository for SqliteWatchRecordRepository {
    fn commit(&self, writes: Vec<WatchRecordWrite>) -> AppResult<CommitSummary> {
        let guarded = self.guard.intercept_all(writes);

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let mut summary = CommitSummary::default();

        for write in &guarded {
            match write {
                GuardedWrite::Insert(record) => {
                    let changed = tx.execute(
                        "INSERT OR IGNORE INTO watch_records (user_id, episode_id, watched_at, completed)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            record.user_id,
                            record.episode_id,
                            record.watched_at.to_rfc3339(),
                            record.completed,
                        ],
                    )?;
                    if changed == 1 {
                        summary.inserted.push(record.key());
                    }
                }
                GuardedWrite::Replace(record) => {
                    summary.replaced += tx.execute(
                        "UPDATE watch_records SET watched_at = ?3, completed = ?4
                         WHERE user_id = ?1 AND episode_id = ?2",
                        params![
                            record.user_id,
                            record.episode_id,
                            record.watched_at.to_rfc3339(),
                            record.completed,
                        ],
                    )?;
                }
                GuardedWrite::Delete {
                    user_id,
                    episode_id,
                } => {
                    let changed = tx.execute(
                        "DELETE FROM watch_records WHERE user_id = ?1 AND episode_id = ?2",
                        params![user_id, episode_id],
                    )?;
                    if changed == 1 {
                        summary.deleted.push((*user_id, *episode_id));
                    }
                }
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    fn get(&self, user_id: UserId, episode_id: EpisodeId) -> AppResult<Option<WatchRecord>> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                "SELECT user_id, episode_id, watched_at, completed FROM watch_records
                 WHERE user_id = ?1 AND episode_id = ?2",
                params![user_id, episode_id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn count_for_series(&self, user_id: UserId, series_id: SeriesId) -> AppResult<u32> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM watch_records w
             JOIN episodes e ON e.id = w.episode_id
             WHERE w.user_id = ?1 AND e.series_id = ?2",
            params![user_id, series_id],
            |row| row.get(0),
        )?;
        Ok(to_count(0, count)?)
    }

    fn count_for_user(&self, user_id: UserId) -> AppResult<u32> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM watch_records WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(to_count(0, count)?)
    }

    fn list_watched_series(&self, user_id: UserId) -> AppResult<Vec<SeriesId>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT e.series_id FROM watch_records w
             JOIN episodes e ON e.id = w.episode_id
             WHERE w.user_id = ?1
             ORDER BY e.series_id",
        )?;
        let series = stmt
            .query_map(params![user_id], |row| row.get::<_, SeriesId>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(series)
    }
}
