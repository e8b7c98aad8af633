// events/types.rs
//
// The two domain events that leave the catalog.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events are immutable
// - Events carry only the data needed to react
// - Wire format is JSON with camelCase field names

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EpisodeId, RatingId, SeriesId, UserId};

pub const EPISODE_COMPLETED_TOPIC: &str = "episode.completed";
pub const REVIEW_CREATED_TOPIC: &str = "review.created";

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone + Serialize {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;

    /// Broker topic the event is published on
    fn topic(&self) -> &'static str;
}

// ============================================================================
// WATCH EVENTS
// ============================================================================

/// Emitted after a watch mutation commits.
/// `is_completed = false` when the episode was un-watched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub episode_id: EpisodeId,
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub is_completed: bool,
}

impl EpisodeCompleted {
    pub fn new(
        episode_id: EpisodeId,
        user_id: UserId,
        series_id: SeriesId,
        is_completed: bool,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            episode_id,
            user_id,
            series_id,
            is_completed,
        }
    }
}

impl DomainEvent for EpisodeCompleted {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "EpisodeCompleted" }
    fn topic(&self) -> &'static str { EPISODE_COMPLETED_TOPIC }
}

// ============================================================================
// REVIEW EVENTS
// ============================================================================

/// Emitted after a rating is created or overwritten
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCreated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub rating_id: RatingId,
    pub user_id: UserId,
    pub series_id: SeriesId,
    pub score: i32,
}

impl ReviewCreated {
    pub fn new(rating_id: RatingId, user_id: UserId, series_id: SeriesId, score: i32) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            rating_id,
            user_id,
            series_id,
            score,
        }
    }
}

impl DomainEvent for ReviewCreated {
    fn event_id(&self) -> Uuid { self.event_id }
    fn occurred_at(&self) -> DateTime<Utc> { self.occurred_at }
    fn event_type(&self) -> &'static str { "ReviewCreated" }
    fn topic(&self) -> &'static str { REVIEW_CREATED_TOPIC }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_completed_wire_names() {
        let event = EpisodeCompleted::new(3, 1, 2, true);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["episodeId"], 3);
        assert_eq!(json["userId"], 1);
        assert_eq!(json["seriesId"], 2);
        assert_eq!(json["isCompleted"], true);
        assert!(json.get("eventId").is_some());
        assert!(json.get("occurredAt").is_some());
    }

    #[test]
    fn test_review_created_decodes_from_wire() {
        let raw = r#"{
            "eventId": "5f0c2f5e-8f5d-4a53-9c0e-1d2b3c4d5e6f",
            "occurredAt": "2024-03-01T12:00:00Z",
            "ratingId": 7,
            "userId": 1,
            "seriesId": 2,
            "score": 9
        }"#;
        let event: ReviewCreated = serde_json::from_str(raw).unwrap();
        assert_eq!(event.rating_id, 7);
        assert_eq!(event.score, 9);
        assert_eq!(event.topic(), REVIEW_CREATED_TOPIC);
    }
}
