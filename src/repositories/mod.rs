// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO event emission
// - NO cross-repository calls
// - Explicit SQL only
//
// The one exception to "no invariant enforcement": the watch-record
// repository runs every pending write through IncompleteRecordGuard
// inside its commit transaction. That commit is the only write path.

pub mod catalog_repository;
pub mod challenge_repository;
pub mod rating_repository;
pub mod recommendation_log_repository;
pub mod watch_record_repository;
pub mod watching_state_repository;

mod row;

pub use catalog_repository::{CatalogRepository, SqliteCatalogRepository};
pub use challenge_repository::{ChallengeRepository, SqliteChallengeRepository};
pub use rating_repository::{RatingRepository, SqliteRatingRepository};
pub use recommendation_log_repository::{
    RecommendationLogRepository, SqliteRecommendationLogRepository,
};
pub use watch_record_repository::{CommitSummary, SqliteWatchRecordRepository, WatchRecordRepository};
pub use watching_state_repository::{SqliteWatchingStateRepository, WatchingStateRepository};

#[cfg(test)]
pub use catalog_repository::MockCatalogRepository;
#[cfg(test)]
pub use rating_repository::MockRatingRepository;
#[cfg(test)]
pub use watch_record_repository::MockWatchRecordRepository;
#[cfg(test)]
pub use watching_state_repository::MockWatchingStateRepository;
