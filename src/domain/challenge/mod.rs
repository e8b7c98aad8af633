//! Critical Challenge Invariants:
//!
//! 1. Progress is ALWAYS recomputed from real activity, never incremented
//! 2. progress_count <= target_count
//! 3. A progress row exists only once derived progress was nonzero
//! 4. completed_at is stamped once and never overwritten
//! 5. A Completed row is terminal

pub mod entity;
pub mod invariants;

pub use entity::{Challenge, ChallengeProgress, ChallengeRule, ChallengeStatus, UserActivity};
pub use invariants::validate_challenge;
