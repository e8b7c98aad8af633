// src/services/mod.rs
//
// Services Module - Orchestration Layer
//
// WatchService and ReviewService are the write gateways: the only code that
// mutates watch records or ratings, and the only code that publishes events.

pub mod challenge_service;
pub mod recommendation_service;
pub mod review_service;
pub mod watch_service;
pub mod watching_state_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use challenge_service::ChallengeService;
pub use recommendation_service::RecommendationService;
pub use review_service::ReviewService;
pub use watch_service::WatchService;
pub use watching_state_service::WatchingStateMachine;
