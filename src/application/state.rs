// src/application/state.rs
//
// Application state: the catalog side of the system, fully wired.
// All fields are Arc-wrapped for thread-safe sharing across callers.

use log::info;
use std::sync::Arc;

use crate::config::{AppConfig, ConsumerConfig};
use crate::db::{
    create_connection_pool, get_connection, get_database_stats, initialize_database,
    initialize_recommendation_store, verify_database_integrity, ConnectionPool, DatabaseStats,
};
use crate::error::AppResult;
use crate::events::{EventConsumer, EventPublisher, MessageBroker};
use crate::repositories::{
    SqliteCatalogRepository, SqliteChallengeRepository, SqliteRatingRepository,
    SqliteRecommendationLogRepository, SqliteWatchRecordRepository,
    SqliteWatchingStateRepository,
};
use crate::services::{
    ChallengeService, RecommendationService, ReviewService, WatchService, WatchingStateMachine,
};

pub struct AppState {
    pub catalog_pool: Arc<ConnectionPool>,
    pub catalog: Arc<SqliteCatalogRepository>,
    pub challenges: Arc<SqliteChallengeRepository>,
    pub watching_state: Arc<WatchingStateMachine>,
    pub watch_service: Arc<WatchService>,
    pub review_service: Arc<ReviewService>,
    pub challenge_service: Arc<ChallengeService>,
    pub recommendation_service: Arc<RecommendationService>,
}

impl AppState {
    /// Open both stores from configuration and wire every service.
    pub fn open(
        config: &AppConfig,
        broker: Arc<dyn MessageBroker>,
        queues: &ConsumerConfig,
    ) -> AppResult<Self> {
        let catalog_pool = Arc::new(create_connection_pool(&config.catalog_db, config.pool_size)?);
        let conn = get_connection(&catalog_pool)?;
        initialize_database(&conn)?;
        drop(conn);

        let recommendation_pool = Arc::new(create_connection_pool(
            &config.recommendation_db,
            config.pool_size,
        )?);
        let conn = get_connection(&recommendation_pool)?;
        initialize_recommendation_store(&conn)?;
        drop(conn);

        info!(
            "[APP] Stores ready: catalog={} recommendation={}",
            config.catalog_db.display(),
            config.recommendation_db.display()
        );
        Self::from_pools(catalog_pool, recommendation_pool, broker, queues)
    }

    /// Wire services over already initialized pools.
    ///
    /// Declares the consumer queues so that events published before the
    /// consumer's first start are kept for it.
    pub fn from_pools(
        catalog_pool: Arc<ConnectionPool>,
        recommendation_pool: Arc<ConnectionPool>,
        broker: Arc<dyn MessageBroker>,
        queues: &ConsumerConfig,
    ) -> AppResult<Self> {
        EventConsumer::declare_queues(broker.as_ref(), queues)?;
        let publisher = EventPublisher::new(broker);

        // Repositories
        let catalog = Arc::new(SqliteCatalogRepository::new(Arc::clone(&catalog_pool)));
        let watches = Arc::new(SqliteWatchRecordRepository::new(Arc::clone(&catalog_pool)));
        let states = Arc::new(SqliteWatchingStateRepository::new(Arc::clone(&catalog_pool)));
        let ratings = Arc::new(SqliteRatingRepository::new(Arc::clone(&catalog_pool)));
        let challenges = Arc::new(SqliteChallengeRepository::new(Arc::clone(&catalog_pool)));
        let recommendations = Arc::new(SqliteRecommendationLogRepository::new(recommendation_pool));

        // Services
        let watching_state = Arc::new(WatchingStateMachine::new(
            catalog.clone(),
            watches.clone(),
            states,
        ));
        let watch_service = Arc::new(WatchService::new(
            catalog.clone(),
            watches.clone(),
            Arc::clone(&watching_state),
            publisher.clone(),
        ));
        let review_service = Arc::new(ReviewService::new(
            ratings.clone(),
            Arc::clone(&watching_state),
            publisher,
        ));
        let challenge_service = Arc::new(ChallengeService::new(
            challenges.clone(),
            catalog.clone(),
            watches,
            ratings,
            Arc::clone(&watching_state),
        ));
        let recommendation_service = Arc::new(RecommendationService::new(
            recommendations,
            Arc::clone(&watching_state),
        ));

        Ok(Self {
            catalog_pool,
            catalog,
            challenges,
            watching_state,
            watch_service,
            review_service,
            challenge_service,
            recommendation_service,
        })
    }

    pub fn verify_integrity(&self) -> AppResult<()> {
        let conn = get_connection(&self.catalog_pool)?;
        verify_database_integrity(&conn)
    }

    pub fn database_stats(&self) -> AppResult<DatabaseStats> {
        let conn = get_connection(&self.catalog_pool)?;
        get_database_stats(&conn)
    }
}
