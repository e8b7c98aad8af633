// events/handlers/recommendation_handler.rs
//
// Recommendation log projection
//
// CRITICAL RULES:
// - The only mutation is flipping watched from false to true
// - Running a handler once or N times for the same event gives the same rows
// - Errors are returned, never swallowed: the consumer nacks on error
// - Blocking store access runs on the blocking pool

use log::{debug, info};
use std::sync::Arc;

use crate::domain::{SeriesId, UserId};
use crate::error::AppResult;
use crate::events::types::{EpisodeCompleted, ReviewCreated};
use crate::repositories::RecommendationLogRepository;

/// A review at or above this score counts as having watched the series
pub const REVIEW_SCORE_THRESHOLD: i32 = 8;

pub struct RecommendationLogHandler {
    repo: Arc<dyn RecommendationLogRepository>,
}

impl RecommendationLogHandler {
    pub fn new(repo: Arc<dyn RecommendationLogRepository>) -> Self {
        Self { repo }
    }

    /// Returns the number of entries flipped
    pub async fn handle_episode_completed(&self, event: &EpisodeCompleted) -> AppResult<usize> {
        if !event.is_completed {
            debug!(
                "[RECOMMENDATION] Episode {} un-watched by user {}, nothing to flip",
                event.episode_id, event.user_id
            );
            return Ok(0);
        }
        self.flip(event.user_id, event.series_id).await
    }

    /// Returns the number of entries flipped
    pub async fn handle_review_created(&self, event: &ReviewCreated) -> AppResult<usize> {
        if event.score < REVIEW_SCORE_THRESHOLD {
            debug!(
                "[RECOMMENDATION] Review {} scored {} (< {}), nothing to flip",
                event.rating_id, event.score, REVIEW_SCORE_THRESHOLD
            );
            return Ok(0);
        }
        self.flip(event.user_id, event.series_id).await
    }

    async fn flip(&self, user_id: UserId, series_id: SeriesId) -> AppResult<usize> {
        let repo = Arc::clone(&self.repo);
        let flipped =
            tokio::task::spawn_blocking(move || repo.mark_watched(user_id, series_id)).await??;

        if flipped > 0 {
            info!(
                "[RECOMMENDATION] Marked {} entries watched for user={} series={}",
                flipped, user_id, series_id
            );
        }
        Ok(flipped)
    }
}
