// src/events/mod.rs
//
// Event System - Public API
//
// Write gateways publish through EventPublisher onto a MessageBroker.
// The EventConsumer process subscribes through the same broker.

// ============================================================================
// EVENT TYPES
// ============================================================================

pub mod types;

// ============================================================================
// TRANSPORT
// ============================================================================

pub mod broker;
pub mod publisher;

// ============================================================================
// CONSUMER SIDE
// ============================================================================

pub mod consumer;
pub mod handlers;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

pub use types::{
    DomainEvent, EpisodeCompleted, ReviewCreated, EPISODE_COMPLETED_TOPIC, REVIEW_CREATED_TOPIC,
};

pub use broker::{Delivery, InMemoryBroker, MessageBroker, MessageId, SqliteBroker, Subscription};
pub use consumer::EventConsumer;
pub use handlers::{RecommendationLogHandler, REVIEW_SCORE_THRESHOLD};
pub use publisher::EventPublisher;
