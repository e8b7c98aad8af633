// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file MUST declare all domain modules and re-export their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Opaque numeric identity owned by the identity service
pub type UserId = i64;
pub type SeriesId = i64;
pub type EpisodeId = i64;
pub type RatingId = i64;
pub type ChallengeId = i64;

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod challenge;
pub mod rating;
pub mod recommendation;
pub mod series;
pub mod watch;
pub mod watching_state;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Catalog (collaborator input)
pub use series::{Episode, Series};

// Watch records
pub use watch::{GuardedWrite, IncompleteRecordGuard, WatchRecord, WatchRecordWrite};

// Derived watching state
pub use watching_state::{WatchingState, WatchingStatus};

// Ratings
pub use rating::{validate_score, Rating, MAX_SCORE, MIN_SCORE};

// Challenges
pub use challenge::{
    validate_challenge, Challenge, ChallengeProgress, ChallengeRule, ChallengeStatus,
    UserActivity,
};

// Recommendation log
pub use recommendation::RecommendationLogEntry;

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid state transition: cannot mark series {attempted} while it is {current}")]
    InvalidStateTransition {
        current: WatchingStatus,
        attempted: WatchingStatus,
    },

    #[error(
        "Review not allowed: finish watching all episodes first (required: finished, current: {current})"
    )]
    ReviewNotAllowed { current: WatchingStatus },

    #[error("Score {score} is outside the allowed range {min}..={max}")]
    ScoreOutOfRange { score: i32, min: i32, max: i32 },

    #[error("Entity not found: {0}")]
    NotFound(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
