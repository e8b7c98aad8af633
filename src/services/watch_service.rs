// src/services/watch_service.rs
//
// Watch Service - the write gateway for watch records
//
// CRITICAL RULES:
// - The only code path that writes watch records
// - Every write goes through the repository commit (and so through the guard)
// - Status is recomputed after every mutation
// - Events are published after the commit, one per affected episode

use log::info;
use std::sync::Arc;

use crate::domain::{
    DomainError, Episode, EpisodeId, SeriesId, UserId, WatchRecord, WatchRecordWrite,
    WatchingState, WatchingStatus,
};
use crate::error::AppResult;
use crate::events::{EpisodeCompleted, EventPublisher};
use crate::repositories::{CatalogRepository, WatchRecordRepository};
use crate::services::WatchingStateMachine;

pub struct WatchService {
    catalog_repo: Arc<dyn CatalogRepository>,
    watch_repo: Arc<dyn WatchRecordRepository>,
    state_machine: Arc<WatchingStateMachine>,
    publisher: EventPublisher,
}

impl WatchService {
    pub fn new(
        catalog_repo: Arc<dyn CatalogRepository>,
        watch_repo: Arc<dyn WatchRecordRepository>,
        state_machine: Arc<WatchingStateMachine>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            catalog_repo,
            watch_repo,
            state_machine,
            publisher,
        }
    }

    fn load_episode(&self, episode_id: EpisodeId) -> AppResult<Episode> {
        self.catalog_repo
            .get_episode(episode_id)?
            .ok_or_else(|| DomainError::NotFound(format!("Episode {}", episode_id)).into())
    }

    /// Record that the user finished an episode.
    ///
    /// Marking an already watched episode keeps the original record and
    /// publishes again, which makes the call safe to retry after a failed publish.
    pub fn mark_episode_watched(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
    ) -> AppResult<WatchingState> {
        // 1. Resolve the episode's series
        let episode = self.load_episode(episode_id)?;

        // 2. Guarded commit
        let summary = self
            .watch_repo
            .commit(vec![WatchRecordWrite::Create(WatchRecord::new(user_id, episode.id))])?;

        // 3. Recompute
        let state = self.state_machine.recompute_status(user_id, episode.series_id)?;

        // 4. Publish
        self.publisher.publish(&EpisodeCompleted::new(
            episode.id,
            user_id,
            episode.series_id,
            true,
        ))?;

        info!(
            "[WATCH] user={} watched {} of series {} (new={}) -> {}",
            user_id,
            episode,
            episode.series_id,
            !summary.inserted.is_empty(),
            state.status
        );
        Ok(state)
    }

    /// Remove the user's watch record for an episode
    pub fn unmark_episode_watched(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
    ) -> AppResult<WatchingState> {
        let episode = self.load_episode(episode_id)?;

        let summary = self.watch_repo.commit(vec![WatchRecordWrite::Delete {
            user_id,
            episode_id: episode.id,
        }])?;

        let state = self.state_machine.recompute_status(user_id, episode.series_id)?;

        self.publisher.publish(&EpisodeCompleted::new(
            episode.id,
            user_id,
            episode.series_id,
            false,
        ))?;

        info!(
            "[WATCH] user={} un-watched {} of series {} (removed={}) -> {}",
            user_id,
            episode,
            episode.series_id,
            !summary.deleted.is_empty(),
            state.status
        );
        Ok(state)
    }

    /// Mark every episode of a series watched in one commit.
    ///
    /// Publishes one event per episode of the set, already watched or not,
    /// so a retry after a failed publish re-sends everything. Then requires
    /// the result to be Finished.
    pub fn mark_series_watched(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> AppResult<WatchingState> {
        // 1. Current episode set
        let episodes = self.catalog_repo.list_episodes(series_id)?;

        // 2. One guarded commit for the whole set
        let writes = episodes
            .iter()
            .map(|episode| WatchRecordWrite::Create(WatchRecord::new(user_id, episode.id)))
            .collect();
        let summary = self.watch_repo.commit(writes)?;

        // 3. Recompute
        let state = self.state_machine.recompute_status(user_id, series_id)?;

        // 4. Publish the whole set
        for episode in &episodes {
            self.publisher
                .publish(&EpisodeCompleted::new(episode.id, user_id, series_id, true))?;
        }

        info!(
            "[WATCH] user={} bulk-watched series {} ({} new of {}) -> {}",
            user_id,
            series_id,
            summary.inserted.len(),
            episodes.len(),
            state.status
        );

        // 5. The bulk path exists to finish the series
        state.ensure_transition(WatchingStatus::Finished)?;
        Ok(state)
    }

    /// Explicit "mark as finished" request. Changes nothing; fails unless
    /// every episode is already watched.
    pub fn mark_series_finished(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> AppResult<WatchingState> {
        self.state_machine
            .validate_transition(user_id, series_id, WatchingStatus::Finished)
    }
}
