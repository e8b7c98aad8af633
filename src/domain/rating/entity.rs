use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{RatingId, SeriesId, UserId};

/// A user's review of a series they finished. One per (user, series).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub user_id: UserId,
    pub series_id: SeriesId,
    /// 1..=10
    pub score: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
