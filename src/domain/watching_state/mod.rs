//! Watching state is ALWAYS derived from watch records and the current
//! episode set. A stored snapshot is a cache, never a source of truth.

pub mod entity;

pub use entity::{WatchingState, WatchingStatus};
