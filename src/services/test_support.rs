// src/services/test_support.rs
//
// Shared fixture for service tests: one in-memory catalog store and an
// in-process broker with the consumer queues declared.

use std::sync::Arc;

use crate::config::ConsumerConfig;
use crate::db::{create_memory_pool, initialize_database, ConnectionPool};
use crate::domain::{Challenge, Episode, EpisodeId, Series, SeriesId};
use crate::events::{EventConsumer, EventPublisher, InMemoryBroker};
use crate::repositories::{
    CatalogRepository, ChallengeRepository, SqliteCatalogRepository, SqliteChallengeRepository,
    SqliteRatingRepository, SqliteWatchRecordRepository, SqliteWatchingStateRepository,
};
use crate::services::WatchingStateMachine;

pub(crate) struct Fixture {
    pub pool: Arc<ConnectionPool>,
    pub catalog: Arc<SqliteCatalogRepository>,
    pub watches: Arc<SqliteWatchRecordRepository>,
    pub states: Arc<SqliteWatchingStateRepository>,
    pub ratings: Arc<SqliteRatingRepository>,
    pub challenges: Arc<SqliteChallengeRepository>,
    pub broker: InMemoryBroker,
    pub queues: ConsumerConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let pool = Arc::new(create_memory_pool().unwrap());
        initialize_database(&pool.get().unwrap()).unwrap();

        let broker = InMemoryBroker::new();
        let queues = ConsumerConfig::default();
        EventConsumer::declare_queues(&broker, &queues).unwrap();

        Self {
            catalog: Arc::new(SqliteCatalogRepository::new(Arc::clone(&pool))),
            watches: Arc::new(SqliteWatchRecordRepository::new(Arc::clone(&pool))),
            states: Arc::new(SqliteWatchingStateRepository::new(Arc::clone(&pool))),
            ratings: Arc::new(SqliteRatingRepository::new(Arc::clone(&pool))),
            challenges: Arc::new(SqliteChallengeRepository::new(Arc::clone(&pool))),
            pool,
            broker,
            queues,
        }
    }

    /// Seed a series. `seasons[i]` is the episode count of season i + 1.
    /// Episode ids are `series_id * 100 + n`, n counting from 1 across seasons.
    pub fn add_series(
        &self,
        series_id: SeriesId,
        title: &str,
        genres: &[&str],
        seasons: &[u32],
    ) -> Vec<EpisodeId> {
        let genres = genres.iter().map(|g| g.to_string()).collect();
        self.catalog
            .save_series(&Series::new(series_id, title, genres))
            .unwrap();

        let mut ids = Vec::new();
        for (season_index, &count) in seasons.iter().enumerate() {
            for number in 1..=count {
                let id = series_id * 100 + ids.len() as i64 + 1;
                self.catalog
                    .save_episode(&Episode::new(id, series_id, season_index as u32 + 1, number))
                    .unwrap();
                ids.push(id);
            }
        }
        ids
    }

    pub fn add_challenge(&self, id: i64, name: &str, category: &str, target: u32) -> Challenge {
        let challenge = Challenge {
            id,
            name: name.to_string(),
            category: category.to_string(),
            target_count: target,
        };
        self.challenges.save_challenge(&challenge).unwrap();
        challenge
    }

    pub fn state_machine(&self) -> Arc<WatchingStateMachine> {
        Arc::new(WatchingStateMachine::new(
            self.catalog.clone(),
            self.watches.clone(),
            self.states.clone(),
        ))
    }

    pub fn publisher(&self) -> EventPublisher {
        EventPublisher::new(Arc::new(self.broker.clone()))
    }

    pub fn episode_events(&self) -> Vec<crate::events::EpisodeCompleted> {
        self.broker
            .pending_payloads(&self.queues.episode_completed_queue)
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    pub fn review_events(&self) -> Vec<crate::events::ReviewCreated> {
        self.broker
            .pending_payloads(&self.queues.review_created_queue)
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}
