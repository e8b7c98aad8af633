//! Watch records are binary: a row exists (watched) or it does not.
//!
//! Invariants:
//! 1. A stored WatchRecord always has `completed == true`
//! 2. At most one WatchRecord per (user, episode)
//! 3. "Un-watching" deletes the row, it is never flipped to incomplete

pub mod entity;
pub mod guard;

pub use entity::WatchRecord;
pub use guard::{GuardedWrite, IncompleteRecordGuard, WatchRecordWrite};
