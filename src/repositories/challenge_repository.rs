// src/repositories/challenge_repository.rs

use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use super::row::{parse_text, parse_timestamp, to_count};
use crate::db::ConnectionPool;
use crate::domain::{Challenge, ChallengeId, ChallengeProgress, UserId};
use crate::error::AppResult;

pub trait ChallengeRepository: Send + Sync {
    fn save_challenge(&self, challenge: &Challenge) -> AppResult<()>;

    fn list_challenges(&self) -> AppResult<Vec<Challenge>>;

    fn get_progress(
        &self,
        user_id: UserId,
        challenge_id: ChallengeId,
    ) -> AppResult<Option<ChallengeProgress>>;

    fn list_progress(&self, user_id: UserId) -> AppResult<Vec<ChallengeProgress>>;

    fn save_progress(&self, progress: &ChallengeProgress) -> AppResult<()>;
}

pub struct SqliteChallengeRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteChallengeRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_challenge(row: &Row) -> rusqlite::Result<Challenge> {
        Ok(Challenge {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            target_count: to_count(3, row.get("target_count")?)?,
        })
    }

    fn row_to_progress(row: &Row) -> rusqlite::Result<ChallengeProgress> {
        let status: String = row.get("status")?;
        let completed_at: Option<String> = row.get("completed_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(ChallengeProgress {
            user_id: row.get("user_id")?,
            challenge_id: row.get("challenge_id")?,
            progress_count: to_count(2, row.get("progress_count")?)?,
            status: parse_text(3, &status)?,
            completed_at: completed_at
                .map(|raw| parse_timestamp(4, &raw))
                .transpose()?,
            updated_at: parse_timestamp(5, &updated_at)?,
        })
    }
}

const SELECT_PROGRESS: &str =
    "SELECT user_id, challenge_id, progress_count, status, completed_at, updated_at
     FROM challenge_progress";

impl ChallengeRepository for SqliteChallengeRepository {
    fn save_challenge(&self, challenge: &Challenge) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO challenges (id, name, category, target_count) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                target_count = excluded.target_count",
            params![
                challenge.id,
                challenge.name,
                challenge.category,
                challenge.target_count,
            ],
        )?;
        Ok(())
    }

    fn list_challenges(&self) -> AppResult<Vec<Challenge>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT id, name, category, target_count FROM challenges ORDER BY id")?;
        let challenges = stmt
            .query_map([], Self::row_to_challenge)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(challenges)
    }

    fn get_progress(
        &self,
        user_id: UserId,
        challenge_id: ChallengeId,
    ) -> AppResult<Option<ChallengeProgress>> {
        let conn = self.pool.get()?;
        let progress = conn
            .query_row(
                &format!("{} WHERE user_id = ?1 AND challenge_id = ?2", SELECT_PROGRESS),
                params![user_id, challenge_id],
                Self::row_to_progress,
            )
            .optional()?;
        Ok(progress)
    }

    fn list_progress(&self, user_id: UserId) -> AppResult<Vec<ChallengeProgress>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE user_id = ?1 ORDER BY challenge_id",
            SELECT_PROGRESS
        ))?;
        let rows = stmt
            .query_map(params![user_id], Self::row_to_progress)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn save_progress(&self, progress: &ChallengeProgress) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO challenge_progress
                (user_id, challenge_id, progress_count, status, completed_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, challenge_id) DO UPDATE SET
                progress_count = excluded.progress_count,
                status = excluded.status,
                completed_at = COALESCE(challenge_progress.completed_at, excluded.completed_at),
                updated_at = excluded.updated_at
             WHERE challenge_progress.status <> 'completed'",
            params![
                progress.user_id,
                progress.challenge_id,
                progress.progress_count,
                progress.status.to_string(),
                progress.completed_at.map(|at| at.to_rfc3339()),
                progress.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
