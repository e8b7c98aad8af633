use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{DomainError, SeriesId, UserId};

/// Progress of one user through one series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchingStatus {
    ToWatch,
    InProgress,
    Finished,
}

/// Derived (user, series) state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchingState {
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub status: WatchingStatus,
    pub watched_count: u32,
    pub total_count: u32,
    pub computed_at: DateTime<Utc>,
}

impl WatchingStatus {
    /// Finished iff watched = total > 0, InProgress iff 0 < watched < total.
    /// Callers count only records within the current episode set.
    pub fn derive(watched_count: u32, total_count: u32) -> Self {
        if total_count > 0 && watched_count == total_count {
            WatchingStatus::Finished
        } else if watched_count > 0 && watched_count < total_count {
            WatchingStatus::InProgress
        } else {
            WatchingStatus::ToWatch
        }
    }
}

impl WatchingState {
    pub fn derive(
        user_id: UserId,
        series_id: SeriesId,
        watched_count: u32,
        total_count: u32,
    ) -> Self {
        Self {
            user_id,
            series_id,
            status: WatchingStatus::derive(watched_count, total_count),
            watched_count,
            total_count,
            computed_at: Utc::now(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == WatchingStatus::Finished
    }

    /// Validate an explicitly requested status against the derived one.
    /// Explicit requests cannot override the data: they must match it.
    pub fn ensure_transition(&self, attempted: WatchingStatus) -> Result<(), DomainError> {
        if self.status == attempted {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition {
                current: self.status,
                attempted,
            })
        }
    }
}

impl std::fmt::Display for WatchingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchingStatus::ToWatch => write!(f, "to_watch"),
            WatchingStatus::InProgress => write!(f, "in_progress"),
            WatchingStatus::Finished => write!(f, "finished"),
        }
    }
}

impl FromStr for WatchingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_watch" => Ok(WatchingStatus::ToWatch),
            "in_progress" => Ok(WatchingStatus::InProgress),
            "finished" => Ok(WatchingStatus::Finished),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown watching status '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        assert_eq!(WatchingStatus::derive(0, 7), WatchingStatus::ToWatch);
        assert_eq!(WatchingStatus::derive(1, 7), WatchingStatus::InProgress);
        assert_eq!(WatchingStatus::derive(6, 7), WatchingStatus::InProgress);
        assert_eq!(WatchingStatus::derive(7, 7), WatchingStatus::Finished);
    }

    #[test]
    fn test_empty_series_is_never_finished() {
        assert_eq!(WatchingStatus::derive(0, 0), WatchingStatus::ToWatch);
    }

    #[test]
    fn test_transition_must_match_derived_status() {
        let state = WatchingState::derive(1, 1, 3, 7);
        match state.ensure_transition(WatchingStatus::Finished) {
            Err(DomainError::InvalidStateTransition { current, attempted }) => {
                assert_eq!(current, WatchingStatus::InProgress);
                assert_eq!(attempted, WatchingStatus::Finished);
            }
            other => panic!("expected invalid transition, got {:?}", other),
        }

        let finished = WatchingState::derive(1, 1, 7, 7);
        assert!(finished.ensure_transition(WatchingStatus::Finished).is_ok());
    }

    #[test]
    fn test_status_text_round_trip() {
        for status in [
            WatchingStatus::ToWatch,
            WatchingStatus::InProgress,
            WatchingStatus::Finished,
        ] {
            assert_eq!(status.to_string().parse::<WatchingStatus>().unwrap(), status);
        }
        assert!("watching".parse::<WatchingStatus>().is_err());
    }
}
