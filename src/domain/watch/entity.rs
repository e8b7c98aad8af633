use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EpisodeId, UserId};

/// Evidence that a user finished one specific episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRecord {
    pub user_id: UserId,
    pub episode_id: EpisodeId,
    pub watched_at: DateTime<Utc>,
    /// Always true once persisted, see `IncompleteRecordGuard`
    pub completed: bool,
}

impl WatchRecord {
    /// A finished episode, stamped now
    pub fn new(user_id: UserId, episode_id: EpisodeId) -> Self {
        Self::at(user_id, episode_id, Utc::now())
    }

    pub fn at(user_id: UserId, episode_id: EpisodeId, watched_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            episode_id,
            watched_at,
            completed: true,
        }
    }

    pub fn key(&self) -> (UserId, EpisodeId) {
        (self.user_id, self.episode_id)
    }
}
