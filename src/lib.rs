// src/lib.rs
// SeriesHub - watching-state consistency and derived-progress engine
//
// Architecture:
// - Domain-centric: business rules live in domain entities and invariants
// - Derived, not stored: watching status and challenge progress are
//   recomputed from raw watch records and ratings
// - One write gateway per mutation type, the only publishers of events
// - Eventually consistent: the recommendation log is updated by an
//   independent consumer process over a message broker

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;

// ============================================================================
// APPLICATION LAYER
// ============================================================================

pub mod application;

// ============================================================================
// PUBLIC API - Domain
// ============================================================================

pub use domain::{
    Challenge, ChallengeProgress, ChallengeRule, ChallengeStatus, DomainError, Episode,
    IncompleteRecordGuard, Rating, RecommendationLogEntry, Series, UserActivity, WatchRecord,
    WatchingState, WatchingStatus,
};

// ============================================================================
// PUBLIC API - Errors and Configuration
// ============================================================================

pub use config::{AppConfig, ConsumerConfig};
pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    DomainEvent, EpisodeCompleted, EventConsumer, EventPublisher, InMemoryBroker, MessageBroker,
    RecommendationLogHandler, ReviewCreated, SqliteBroker,
};

// ============================================================================
// PUBLIC API - Database
// ============================================================================

pub use db::{create_connection_pool, initialize_database, ConnectionPool};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{
    ChallengeService, RecommendationService, ReviewService, WatchService, WatchingStateMachine,
};

// ============================================================================
// PUBLIC API - Application Layer
// ============================================================================

pub use application::{AppState, ErrorResponse, ErrorType};
