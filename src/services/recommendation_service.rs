// src/services/recommendation_service.rs
//
// Recommendation Service - creates recommendation log entries
//
// Entries live in the recommendation store. This service only creates and
// reads them; flipping `watched` belongs to the event consumer.

use chrono::Utc;
use log::info;
use std::sync::Arc;

use crate::domain::{RecommendationLogEntry, SeriesId, UserId};
use crate::error::AppResult;
use crate::repositories::RecommendationLogRepository;
use crate::services::WatchingStateMachine;

pub struct RecommendationService {
    recommendation_repo: Arc<dyn RecommendationLogRepository>,
    state_machine: Arc<WatchingStateMachine>,
}

impl RecommendationService {
    pub fn new(
        recommendation_repo: Arc<dyn RecommendationLogRepository>,
        state_machine: Arc<WatchingStateMachine>,
    ) -> Self {
        Self {
            recommendation_repo,
            state_machine,
        }
    }

    /// Log that `series_id` was recommended to the user.
    ///
    /// A series the user already finished is logged as watched.
    pub fn recommend(&self, user_id: UserId, series_id: SeriesId) -> AppResult<RecommendationLogEntry> {
        let state = self.state_machine.recompute_status(user_id, series_id)?;
        let entry =
            self.recommendation_repo
                .create(user_id, series_id, state.is_finished(), Utc::now())?;

        info!(
            "[RECOMMENDATION] Logged series {} for user {} (entry {}, watched={})",
            series_id, user_id, entry.id, entry.watched
        );
        Ok(entry)
    }

    pub fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<RecommendationLogEntry>> {
        self.recommendation_repo.list_for_user(user_id)
    }
}
