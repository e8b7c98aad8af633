// src/services/review_service.rs
//
// Review Service - the review gate and write gateway for ratings
//
// CRITICAL RULES:
// - A rating exists only for a series the user has Finished
// - The status is recomputed here, never taken from the caller or the cache
// - One rating per (user, series): a second review overwrites the first
// - ReviewCreated is published after the upsert commits

use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;

use crate::domain::{validate_score, DomainError, Rating, SeriesId, UserId};
use crate::error::AppResult;
use crate::events::{EventPublisher, ReviewCreated};
use crate::repositories::RatingRepository;
use crate::services::WatchingStateMachine;

pub struct ReviewService {
    rating_repo: Arc<dyn RatingRepository>,
    state_machine: Arc<WatchingStateMachine>,
    publisher: EventPublisher,
}

impl ReviewService {
    pub fn new(
        rating_repo: Arc<dyn RatingRepository>,
        state_machine: Arc<WatchingStateMachine>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            rating_repo,
            state_machine,
            publisher,
        }
    }

    /// Create the user's rating for a series, or overwrite the existing one.
    ///
    /// Fails with `ReviewNotAllowed` carrying the observed status unless the
    /// series is Finished for this user.
    pub fn create_or_update_review(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        score: i32,
        comment: Option<String>,
    ) -> AppResult<Rating> {
        // 1. Gate on the freshly derived status
        let state = self.state_machine.recompute_status(user_id, series_id)?;
        if !state.is_finished() {
            warn!(
                "[REVIEW] Rejected review by user={} on series={}: status is {}",
                user_id, series_id, state.status
            );
            return Err(DomainError::ReviewNotAllowed {
                current: state.status,
            }
            .into());
        }

        // 2. Validate input
        validate_score(score)?;

        // 3. Upsert the single rating row
        let rating = self
            .rating_repo
            .upsert(user_id, series_id, score, comment, Utc::now())?;

        // 4. Publish
        self.publisher.publish(&ReviewCreated::new(
            rating.id,
            rating.user_id,
            rating.series_id,
            rating.score,
        ))?;

        info!(
            "[REVIEW] user={} rated series={} {}/10 (rating {})",
            user_id, series_id, rating.score, rating.id
        );
        Ok(rating)
    }

    pub fn get_review(&self, user_id: UserId, series_id: SeriesId) -> AppResult<Option<Rating>> {
        self.rating_repo.get(user_id, series_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Series, WatchRecord, WatchRecordWrite, WatchingStatus};
    use crate::error::AppError;
    use crate::events::InMemoryBroker;
    use crate::repositories::{
        MockCatalogRepository, MockRatingRepository, MockWatchRecordRepository,
        MockWatchingStateRepository, WatchRecordRepository,
    };
    use crate::services::test_support::Fixture;

    /// A gate whose state machine sees `watched` of `total` episodes
    fn mocked_gate(watched: u32, total: u32, ratings: MockRatingRepository) -> ReviewService {
        let mut catalog = MockCatalogRepository::new();
        catalog
            .expect_get_series()
            .returning(|id| Ok(Some(Series::new(id, "Mocked", vec![]))));
        catalog.expect_count_episodes().returning(move |_| Ok(total));

        let mut watches = MockWatchRecordRepository::new();
        watches
            .expect_count_for_series()
            .returning(move |_, _| Ok(watched));

        let mut states = MockWatchingStateRepository::new();
        states.expect_get_snapshot().returning(|_, _| Ok(None));
        states.expect_save_snapshot().returning(|_| Ok(()));

        let machine = Arc::new(WatchingStateMachine::new(
            Arc::new(catalog),
            Arc::new(watches),
            Arc::new(states),
        ));
        ReviewService::new(
            Arc::new(ratings),
            machine,
            EventPublisher::new(Arc::new(InMemoryBroker::new())),
        )
    }

    #[test]
    fn test_gate_never_writes_before_finished() {
        for (watched, expected) in [(0, WatchingStatus::ToWatch), (3, WatchingStatus::InProgress)] {
            let mut ratings = MockRatingRepository::new();
            ratings.expect_upsert().never();

            let err = mocked_gate(watched, 7, ratings)
                .create_or_update_review(1, 2, 9, None)
                .unwrap_err();
            match err {
                AppError::Domain(DomainError::ReviewNotAllowed { current }) => {
                    assert_eq!(current, expected)
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[test]
    fn test_gate_checks_status_before_score() {
        let mut ratings = MockRatingRepository::new();
        ratings.expect_upsert().never();

        // Out-of-range score on an unfinished series reports the status, not the score
        let err = mocked_gate(1, 7, ratings)
            .create_or_update_review(1, 2, 42, None)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::ReviewNotAllowed { .. })
        ));
    }

    #[test]
    fn test_invalid_score_rejected_when_finished() {
        let mut ratings = MockRatingRepository::new();
        ratings.expect_upsert().never();

        let err = mocked_gate(7, 7, ratings)
            .create_or_update_review(1, 2, 0, None)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::ScoreOutOfRange { score: 0, .. })
        ));
    }

    #[test]
    fn test_second_review_overwrites_and_publishes_twice() {
        let fixture = Fixture::new();
        let episodes = fixture.add_series(1, "Show", &[], &[2]);
        let machine = fixture.state_machine();
        let service = ReviewService::new(fixture.ratings.clone(), machine, fixture.publisher());

        fixture
            .watches
            .commit(
                episodes
                    .iter()
                    .map(|&id| WatchRecordWrite::Create(WatchRecord::new(5, id)))
                    .collect(),
            )
            .unwrap();

        let first = service
            .create_or_update_review(5, 1, 9, Some("great".to_string()))
            .unwrap();
        let second = service.create_or_update_review(5, 1, 7, None).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.score, 7);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(fixture.ratings.count_for_user(5).unwrap(), 1);
        assert_eq!(service.get_review(5, 1).unwrap().unwrap().score, 7);

        let scores: Vec<i32> = fixture.review_events().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![9, 7]);
    }
}
