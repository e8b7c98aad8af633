// src/domain/watch/guard.rs
//
// Incomplete Record Guard
//
// The one place where a pending watch-record write is inspected before commit.
// Every repository write path (single row and bulk) hands its writes here
// inside the transaction that commits them.

use log::warn;

use super::entity::WatchRecord;
use crate::domain::{EpisodeId, UserId};

/// A write a caller wants to apply to the watch_records table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchRecordWrite {
    /// Insert a new row (ignored if the pair is already watched)
    Create(WatchRecord),
    /// Overwrite an existing row
    Update(WatchRecord),
    /// Remove the row ("un-watch")
    Delete {
        user_id: UserId,
        episode_id: EpisodeId,
    },
}

/// What actually reaches the database after the guard ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedWrite {
    Insert(WatchRecord),
    Replace(WatchRecord),
    Delete {
        user_id: UserId,
        episode_id: EpisodeId,
    },
}

/// Pre-commit hook for watch records. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct IncompleteRecordGuard;

impl IncompleteRecordGuard {
    /// Rewrite a single pending write so that no incomplete row is ever stored.
    ///
    /// - create with `completed = false` becomes a completed insert
    /// - update to `completed = false` becomes a delete
    pub fn intercept(&self, write: WatchRecordWrite) -> GuardedWrite {
        match write {
            WatchRecordWrite::Create(mut record) => {
                if !record.completed {
                    warn!(
                        "[GUARD] Incomplete watch record created for user={} episode={}, forcing completed",
                        record.user_id, record.episode_id
                    );
                    record.completed = true;
                }
                GuardedWrite::Insert(record)
            }
            WatchRecordWrite::Update(record) => {
                if record.completed {
                    GuardedWrite::Replace(record)
                } else {
                    warn!(
                        "[GUARD] Update would mark user={} episode={} incomplete, deleting row instead",
                        record.user_id, record.episode_id
                    );
                    GuardedWrite::Delete {
                        user_id: record.user_id,
                        episode_id: record.episode_id,
                    }
                }
            }
            WatchRecordWrite::Delete {
                user_id,
                episode_id,
            } => GuardedWrite::Delete {
                user_id,
                episode_id,
            },
        }
    }

    pub fn intercept_all<I>(&self, writes: I) -> Vec<GuardedWrite>
    where
        I: IntoIterator<Item = WatchRecordWrite>,
    {
        writes.into_iter().map(|w| self.intercept(w)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incomplete(user_id: UserId, episode_id: EpisodeId) -> WatchRecord {
        let mut record = WatchRecord::new(user_id, episode_id);
        record.completed = false;
        record
    }

    #[test]
    fn test_incomplete_create_is_forced_completed() {
        let guard = IncompleteRecordGuard;
        match guard.intercept(WatchRecordWrite::Create(incomplete(1, 10))) {
            GuardedWrite::Insert(record) => {
                assert!(record.completed);
                assert_eq!(record.key(), (1, 10));
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_update_becomes_delete() {
        let guard = IncompleteRecordGuard;
        assert_eq!(
            guard.intercept(WatchRecordWrite::Update(incomplete(1, 10))),
            GuardedWrite::Delete {
                user_id: 1,
                episode_id: 10
            }
        );
    }

    #[test]
    fn test_completed_writes_pass_through() {
        let guard = IncompleteRecordGuard;
        let record = WatchRecord::new(2, 20);

        assert_eq!(
            guard.intercept(WatchRecordWrite::Create(record.clone())),
            GuardedWrite::Insert(record.clone())
        );
        assert_eq!(
            guard.intercept(WatchRecordWrite::Update(record.clone())),
            GuardedWrite::Replace(record)
        );
    }

    #[test]
    fn test_intercept_all_never_yields_incomplete_rows() {
        let guard = IncompleteRecordGuard;
        let writes = vec![
            WatchRecordWrite::Create(incomplete(1, 1)),
            WatchRecordWrite::Update(incomplete(1, 2)),
            WatchRecordWrite::Create(WatchRecord::new(1, 3)),
            WatchRecordWrite::Delete {
                user_id: 1,
                episode_id: 4,
            },
        ];

        for guarded in guard.intercept_all(writes) {
            match guarded {
                GuardedWrite::Insert(r) | GuardedWrite::Replace(r) => assert!(r.completed),
                GuardedWrite::Delete { .. } => {}
            }
        }
    }
}
