pub mod entity;
pub mod invariants;

pub use entity::Rating;
pub use invariants::{validate_score, MAX_SCORE, MIN_SCORE};
