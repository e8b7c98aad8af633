// events/handlers/mod.rs
//
// Consumer-side handlers. Each one maps a decoded event to an idempotent
// store mutation and reports how many rows it changed.

pub mod recommendation_handler;

pub use recommendation_handler::{RecommendationLogHandler, REVIEW_SCORE_THRESHOLD};
