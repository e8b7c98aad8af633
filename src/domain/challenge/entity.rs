use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{ChallengeId, DomainError, UserId};

/// Static challenge definition, owned by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub name: String,
    pub category: String,
    pub target_count: u32,
}

/// Which activity counter feeds a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeRule {
    /// Series in Finished state
    FinishedSeries,
    /// Watch records
    WatchedEpisodes,
    /// Finished series tagged with a drama genre
    FinishedDramas,
    /// Distinct ratings written
    Ratings,
}

/// Aggregated activity of one user, computed fresh for each recomputation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub finished_series: u32,
    pub watched_episodes: u32,
    pub finished_dramas: u32,
    pub ratings: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    InProgress,
    Completed,
}

/// A user's progress towards one challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    pub user_id: UserId,
    pub challenge_id: ChallengeId,
    pub progress_count: u32,
    pub status: ChallengeStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ChallengeRule {
    /// Category wins over name. Within a text, the more specific keyword wins,
    /// so "Drama Series Marathon" counts dramas, not all series.
    pub fn classify(challenge: &Challenge) -> Option<Self> {
        Self::from_keyword(&challenge.category).or_else(|| Self::from_keyword(&challenge.name))
    }

    /// Keywords match at the start of a word, so "Moderate" is not "rate"
    fn from_keyword(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has = |keyword: &str| words.iter().any(|word| word.starts_with(keyword));

        if has("drama") {
            Some(ChallengeRule::FinishedDramas)
        } else if has("episode") {
            Some(ChallengeRule::WatchedEpisodes)
        } else if has("rate") || has("rating") || has("review") {
            Some(ChallengeRule::Ratings)
        } else if has("series") {
            Some(ChallengeRule::FinishedSeries)
        } else {
            None
        }
    }
}

impl UserActivity {
    pub fn count_for(&self, rule: ChallengeRule) -> u32 {
        match rule {
            ChallengeRule::FinishedSeries => self.finished_series,
            ChallengeRule::WatchedEpisodes => self.watched_episodes,
            ChallengeRule::FinishedDramas => self.finished_dramas,
            ChallengeRule::Ratings => self.ratings,
        }
    }
}

impl ChallengeProgress {
    /// First progress for a challenge. No row for zero progress.
    pub fn start(
        user_id: UserId,
        challenge: &Challenge,
        derived: u32,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if derived == 0 {
            return None;
        }
        let mut progress = Self {
            user_id,
            challenge_id: challenge.id,
            progress_count: 0,
            status: ChallengeStatus::InProgress,
            completed_at: None,
            updated_at: now,
        };
        progress.refresh(challenge, derived, now);
        Some(progress)
    }

    /// Apply a recomputed activity count. Returns true if the row changed.
    ///
    /// While in progress the count follows activity, down as well as up.
    /// Completed rows are frozen.
    pub fn refresh(&mut self, challenge: &Challenge, derived: u32, now: DateTime<Utc>) -> bool {
        if self.status == ChallengeStatus::Completed {
            return false;
        }

        let clamped = derived.min(challenge.target_count);
        let reached = clamped >= challenge.target_count;
        if clamped == self.progress_count && !reached {
            return false;
        }

        self.progress_count = clamped;
        if reached {
            self.status = ChallengeStatus::Completed;
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        }
        self.updated_at = now;
        true
    }

    pub fn is_completed(&self) -> bool {
        self.status == ChallengeStatus::Completed
    }
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeStatus::InProgress => write!(f, "in_progress"),
            ChallengeStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ChallengeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ChallengeStatus::InProgress),
            "completed" => Ok(ChallengeStatus::Completed),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown challenge status '{}'",
                other
            ))),
        }
    }
}
