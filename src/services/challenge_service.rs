// src/services/challenge_service.rs
//
// Challenge Service - challenge progress calculator
//
// CRITICAL RULES:
// - Progress is recomputed from real activity, never incremented
// - One rule per challenge, chosen by keyword (category first, then name)
// - No row for zero progress
// - completed_at is stamped once; completed rows are never touched again

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::domain::{validate_challenge, ChallengeProgress, ChallengeRule, UserActivity, UserId};
use crate::error::AppResult;
use crate::repositories::{
    CatalogRepository, ChallengeRepository, RatingRepository, WatchRecordRepository,
};
use crate::services::WatchingStateMachine;

const DRAMA_GENRE: &str = "drama";

pub struct ChallengeService {
    challenge_repo: Arc<dyn ChallengeRepository>,
    catalog_repo: Arc<dyn CatalogRepository>,
    watch_repo: Arc<dyn WatchRecordRepository>,
    rating_repo: Arc<dyn RatingRepository>,
    state_machine: Arc<WatchingStateMachine>,
}

impl ChallengeService {
    pub fn new(
        challenge_repo: Arc<dyn ChallengeRepository>,
        catalog_repo: Arc<dyn CatalogRepository>,
        watch_repo: Arc<dyn WatchRecordRepository>,
        rating_repo: Arc<dyn RatingRepository>,
        state_machine: Arc<WatchingStateMachine>,
    ) -> Self {
        Self {
            challenge_repo,
            catalog_repo,
            watch_repo,
            rating_repo,
            state_machine,
        }
    }

    /// Aggregate the user's activity from watch records and ratings
    pub fn user_activity(&self, user_id: UserId) -> AppResult<UserActivity> {
        let mut activity = UserActivity {
            watched_episodes: self.watch_repo.count_for_user(user_id)?,
            ratings: self.rating_repo.count_for_user(user_id)?,
            ..UserActivity::default()
        };

        // Only series with at least one record can be finished
        for series_id in self.watch_repo.list_watched_series(user_id)? {
            if !self.state_machine.recompute_status(user_id, series_id)?.is_finished() {
                continue;
            }
            activity.finished_series += 1;

            let is_drama = self
                .catalog_repo
                .get_series(series_id)?
                .map(|series| series.has_genre(DRAMA_GENRE))
                .unwrap_or(false);
            if is_drama {
                activity.finished_dramas += 1;
            }
        }

        Ok(activity)
    }

    /// Recompute every challenge for the user and persist what changed.
    ///
    /// Returns the user's progress rows after recomputation. Idempotent.
    pub fn recompute_for_user(&self, user_id: UserId) -> AppResult<Vec<ChallengeProgress>> {
        // 1. Activity, computed once for all challenges
        let activity = self.user_activity(user_id)?;
        let now = Utc::now();
        let mut rows = Vec::new();

        for challenge in self.challenge_repo.list_challenges()? {
            // 2. Pick the rule
            if let Err(e) = validate_challenge(&challenge) {
                warn!("[CHALLENGE] Skipping challenge {}: {}", challenge.id, e);
                continue;
            }
            let Some(rule) = ChallengeRule::classify(&challenge) else {
                debug!(
                    "[CHALLENGE] No rule matches challenge {} ('{}' / '{}'), skipped",
                    challenge.id, challenge.name, challenge.category
                );
                continue;
            };
            let derived = activity.count_for(rule);

            // 3. Apply to the existing row, or create one for nonzero progress
            let progress = match self.challenge_repo.get_progress(user_id, challenge.id)? {
                Some(mut progress) => {
                    if !progress.refresh(&challenge, derived, now) {
                        rows.push(progress);
                        continue;
                    }
                    progress
                }
                None => match ChallengeProgress::start(user_id, &challenge, derived, now) {
                    Some(progress) => progress,
                    None => continue,
                },
            };

            // 4. Persist the change, then report what the store kept
            self.challenge_repo.save_progress(&progress)?;
            let stored = self
                .challenge_repo
                .get_progress(user_id, challenge.id)?
                .unwrap_or(progress);
            if stored.is_completed() {
                info!("[CHALLENGE] user={} completed '{}'", user_id, challenge.name);
            }
            rows.push(stored);
        }

        Ok(rows)
    }

    /// Stored progress rows, without recomputation
    pub fn progress_for_user(&self, user_id: UserId) -> AppResult<Vec<ChallengeProgress>> {
        self.challenge_repo.list_progress(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChallengeStatus, WatchRecord, WatchRecordWrite};
    use crate::services::test_support::Fixture;

    fn service(fixture: &Fixture) -> ChallengeService {
        ChallengeService::new(
            fixture.challenges.clone(),
            fixture.catalog.clone(),
            fixture.watches.clone(),
            fixture.ratings.clone(),
            fixture.state_machine(),
        )
    }

    fn finish(fixture: &Fixture, user_id: UserId, episodes: &[i64]) {
        let writes = episodes
            .iter()
            .map(|&id| WatchRecordWrite::Create(WatchRecord::new(user_id, id)))
            .collect();
        fixture.watches.commit(writes).unwrap();
    }

    fn progress_of(rows: &[ChallengeProgress], challenge_id: i64) -> Option<&ChallengeProgress> {
        rows.iter().find(|p| p.challenge_id == challenge_id)
    }

    #[test]
    fn test_watch_ten_series_completes_once() {
        let fixture = Fixture::new();
        fixture.add_challenge(1, "Watch 10 Series", "series", 10);
        let service = service(&fixture);

        let mut all_series = Vec::new();
        for id in 1..=11 {
            all_series.push(fixture.add_series(id, &format!("Show {}", id), &[], &[2]));
        }

        for episodes in &all_series[..3] {
            finish(&fixture, 1, episodes);
        }
        let rows = service.recompute_for_user(1).unwrap();
        let progress = progress_of(&rows, 1).unwrap();
        assert_eq!(progress.progress_count, 3);
        assert_eq!(progress.status, ChallengeStatus::InProgress);
        assert!(progress.completed_at.is_none());

        for episodes in &all_series[3..10] {
            finish(&fixture, 1, episodes);
        }
        let rows = service.recompute_for_user(1).unwrap();
        let completed = progress_of(&rows, 1).unwrap().clone();
        assert_eq!(completed.progress_count, 10);
        assert_eq!(completed.status, ChallengeStatus::Completed);
        assert!(completed.completed_at.is_some());

        // More activity and another pass leave the completed row alone
        finish(&fixture, 1, &all_series[10]);
        let rows = service.recompute_for_user(1).unwrap();
        assert_eq!(progress_of(&rows, 1).unwrap(), &completed);
        assert_eq!(service.progress_for_user(1).unwrap(), vec![completed]);
    }

    #[test]
    fn test_zero_progress_creates_no_row() {
        let fixture = Fixture::new();
        fixture.add_challenge(1, "Watch 10 Series", "series", 10);
        fixture.add_challenge(2, "Binge", "episodes", 100);
        let episodes = fixture.add_series(1, "Show", &[], &[3]);
        finish(&fixture, 1, &episodes[..1]);

        let rows = service(&fixture).recompute_for_user(1).unwrap();
        assert!(progress_of(&rows, 1).is_none());
        assert_eq!(progress_of(&rows, 2).unwrap().progress_count, 1);
    }

    #[test]
    fn test_each_rule_counts_its_own_activity() {
        let fixture = Fixture::new();
        fixture.add_challenge(1, "Drama Marathon", "series", 5);
        fixture.add_challenge(2, "Binge", "episode", 50);
        fixture.add_challenge(3, "Critic", "review", 5);
        fixture.add_challenge(4, "Finisher", "series", 5);
        fixture.add_challenge(5, "Mystery", "misc", 5);

        let drama = fixture.add_series(1, "Drama Show", &["Crime Drama"], &[2]);
        let comedy = fixture.add_series(2, "Comedy Show", &["Comedy"], &[3]);
        finish(&fixture, 1, &drama);
        finish(&fixture, 1, &comedy);
        fixture.ratings.upsert(1, 1, 9, None, Utc::now()).unwrap();

        let rows = service(&fixture).recompute_for_user(1).unwrap();
        // Category wins over name: "Drama Marathon" filed under "series"
        // counts every finished series
        assert_eq!(progress_of(&rows, 1).unwrap().progress_count, 2);
        assert_eq!(progress_of(&rows, 2).unwrap().progress_count, 5);
        assert_eq!(progress_of(&rows, 3).unwrap().progress_count, 1);
        assert_eq!(progress_of(&rows, 4).unwrap().progress_count, 2);
        assert!(progress_of(&rows, 5).is_none());
    }

    #[test]
    fn test_drama_category_counts_finished_dramas_only() {
        let fixture = Fixture::new();
        fixture.add_challenge(1, "Tearjerker", "Drama", 3);
        let drama = fixture.add_series(1, "A", &["drama"], &[1]);
        let other = fixture.add_series(2, "B", &["action"], &[1]);
        let unfinished = fixture.add_series(3, "C", &["melodrama"], &[2]);
        finish(&fixture, 1, &drama);
        finish(&fixture, 1, &other);
        finish(&fixture, 1, &unfinished[..1]);

        let rows = service(&fixture).recompute_for_user(1).unwrap();
        assert_eq!(progress_of(&rows, 1).unwrap().progress_count, 1);
    }

    #[test]
    fn test_in_progress_count_follows_activity_down() {
        let fixture = Fixture::new();
        fixture.add_challenge(1, "Binge", "episodes", 10);
        let episodes = fixture.add_series(1, "Show", &[], &[4]);
        let service = service(&fixture);

        finish(&fixture, 1, &episodes);
        assert_eq!(service.recompute_for_user(1).unwrap()[0].progress_count, 4);

        fixture
            .watches
            .commit(vec![WatchRecordWrite::Delete {
                user_id: 1,
                episode_id: episodes[0],
            }])
            .unwrap();
        let rows = service.recompute_for_user(1).unwrap();
        assert_eq!(rows[0].progress_count, 3);
        assert_eq!(rows[0].status, ChallengeStatus::InProgress);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let fixture = Fixture::new();
        fixture.add_challenge(1, "Binge", "episodes", 10);
        let episodes = fixture.add_series(1, "Show", &[], &[4]);
        finish(&fixture, 1, &episodes);
        let service = service(&fixture);

        let first = service.recompute_for_user(1).unwrap();
        let second = service.recompute_for_user(1).unwrap();
        assert_eq!(first, second);
    }
}
