use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{SeriesId, UserId};

/// Records whether a series suggested to a user was eventually watched.
///
/// `watched` only ever moves false -> true, and only the event consumer moves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationLogEntry {
    pub id: i64,
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub recommended_at: DateTime<Utc>,
    pub watched: bool,
}
