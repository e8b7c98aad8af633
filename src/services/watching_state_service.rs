// src/services/watching_state_service.rs
//
// Watching State Machine
//
// CRITICAL RULES:
// - Status is DERIVED from watch records, never stored as truth
// - Every read of a status recomputes it against the current episode set
// - The snapshot table is a cache for listing, refreshed on every recompute
// - Explicit status requests must agree with the data

use log::{debug, info};
use std::sync::Arc;

use crate::domain::{DomainError, SeriesId, UserId, WatchingState, WatchingStatus};
use crate::error::AppResult;
use crate::repositories::{CatalogRepository, WatchRecordRepository, WatchingStateRepository};

pub struct WatchingStateMachine {
    catalog_repo: Arc<dyn CatalogRepository>,
    watch_repo: Arc<dyn WatchRecordRepository>,
    state_repo: Arc<dyn WatchingStateRepository>,
}

impl WatchingStateMachine {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository>,
        watch_repo: Arc<dyn WatchRecordRepository>,
        state_repo: Arc<dyn WatchingStateRepository>,
    ) -> Self {
        Self {
            catalog_repo,
            watch_repo,
            state_repo,
        }
    }

    /// Derive the (user, series) state from the records on the series'
    /// current episode set. Idempotent.
    ///
    /// A series whose episode set grew after it was finished comes back
    /// as InProgress.
    pub fn recompute_status(&self, user_id: UserId, series_id: SeriesId) -> AppResult<WatchingState> {
        // 1. Series must exist
        if self.catalog_repo.get_series(series_id)?.is_none() {
            return Err(DomainError::NotFound(format!("Series {}", series_id)).into());
        }

        // 2. Count both sides of the comparison
        let total = self.catalog_repo.count_episodes(series_id)?;
        let watched = self.watch_repo.count_for_series(user_id, series_id)?;

        // 3. Derive and refresh the cache
        let state = WatchingState::derive(user_id, series_id, watched, total);
        let previous = self.state_repo.get_snapshot(user_id, series_id)?;
        self.state_repo.save_snapshot(&state)?;

        if let Some(previous) = previous.filter(|p| p.status != state.status) {
            info!(
                "[WATCHING] user={} series={} {} -> {}",
                user_id, series_id, previous.status, state.status
            );
        }
        debug!(
            "[WATCHING] user={} series={} -> {} ({}/{})",
            user_id, series_id, state.status, watched, total
        );
        Ok(state)
    }

    /// Check an explicitly requested status against the recomputed one.
    ///
    /// Fails with `InvalidStateTransition` when they differ.
    pub fn validate_transition(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        attempted: WatchingStatus,
    ) -> AppResult<WatchingState> {
        let state = self.recompute_status(user_id, series_id)?;
        state.ensure_transition(attempted)?;
        Ok(state)
    }

    /// Series the user has touched, recomputed, filtered to `status`
    pub fn watchlist(&self, user_id: UserId, status: WatchingStatus) -> AppResult<Vec<WatchingState>> {
        let mut series_ids = self.state_repo.list_tracked_series(user_id)?;
        series_ids.extend(self.watch_repo.list_watched_series(user_id)?);
        series_ids.sort_unstable();
        series_ids.dedup();

        let mut states = Vec::new();
        for series_id in series_ids {
            let state = self.recompute_status(user_id, series_id)?;
            if state.status == status {
                states.push(state);
            }
        }
        Ok(states)
    }
}
