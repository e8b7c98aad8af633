use serde::{Deserialize, Serialize};

use crate::domain::{EpisodeId, SeriesId};

/// Catalog series, owned by the catalog side of the application.
/// The core only reads it to know the episode set and the genre tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub id: SeriesId,
    pub title: String,
    /// Free-form genre tags ("Crime Drama", "Comedy", ...)
    pub genres: Vec<String>,
}

/// One episode of a series, addressed by season and number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub series_id: SeriesId,
    pub season_number: u32,
    pub episode_number: u32,
}

impl Series {
    pub fn new(id: SeriesId, title: impl Into<String>, genres: Vec<String>) -> Self {
        Self {
            id,
            title: title.into(),
            genres,
        }
    }

    /// Case-insensitive substring match against every genre tag.
    pub fn has_genre(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.genres
            .iter()
            .any(|genre| genre.to_lowercase().contains(&needle))
    }
}

impl Episode {
    pub fn new(id: EpisodeId, series_id: SeriesId, season_number: u32, episode_number: u32) -> Self {
        Self {
            id,
            series_id,
            season_number,
            episode_number,
        }
    }
}

impl std::fmt::Display for Episode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{:02}E{:02}", self.season_number, self.episode_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_match_is_case_insensitive_substring() {
        let series = Series::new(1, "Breaking Bad", vec!["Crime DRAMA".to_string()]);
        assert!(series.has_genre("drama"));
        assert!(series.has_genre("Crime"));
        assert!(!series.has_genre("comedy"));
    }

    #[test]
    fn test_episode_display() {
        let episode = Episode::new(7, 1, 2, 3);
        assert_eq!(episode.to_string(), "S02E03");
    }
}
