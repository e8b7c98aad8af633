// src/repositories/catalog_repository.rs
//
// Catalog structure (series, genres, episodes).
//
// The catalog is owned by other parts of the application; this core reads it
// to know each series' current episode set and genre tags. The save methods
// exist for the catalog side and for test setup.

use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use super::row::to_count;
use crate::db::ConnectionPool;
use crate::domain::{Episode, EpisodeId, Series, SeriesId};
use crate::error::AppResult;

// ---------------------------------------------------------------------
// Repository contract
// ---------------------------------------------------------------------
#[cfg_attr(test, mockall::automock)]
pub trait CatalogRepository: Send + Sync {
    fn save_series(&self, series: &Series) -> AppResult<()>;

    fn save_episode(&self, episode: &Episode) -> AppResult<()>;

    fn get_series(&self, id: SeriesId) -> AppResult<Option<Series>>;

    fn get_episode(&self, id: EpisodeId) -> AppResult<Option<Episode>>;

    /// Current episode set, ordered by season then number
    fn list_episodes(&self, series_id: SeriesId) -> AppResult<Vec<Episode>>;

    /// Cardinality of the current episode set
    fn count_episodes(&self, series_id: SeriesId) -> AppResult<u32>;
}

pub struct SqliteCatalogRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteCatalogRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_episode(row: &Row) -> rusqlite::Result<Episode> {
        Ok(Episode {
            id: row.get("id")?,
            series_id: row.get("series_id")?,
            season_number: to_count(2, row.get("season_number")?)?,
            episode_number: to_count(3, row.get("episode_number")?)?,
        })
    }
}

// ---------------------------------------------------------------------
// SQLite Implementation
// ---------------------------------------------------------------------
impl CatalogRepository for SqliteCatalogRepository {
    fn save_series(&self, series: &Series) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO series (id, title) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title",
            params![series.id, series.title],
        )?;
        tx.execute(
            "DELETE FROM series_genres WHERE series_id = ?1",
            params![series.id],
        )?;
        for genre in &series.genres {
            tx.execute(
                "INSERT OR IGNORE INTO series_genres (series_id, genre) VALUES (?1, ?2)",
                params![series.id, genre],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn save_episode(&self, episode: &Episode) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO episodes (id, series_id, season_number, episode_number)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                series_id = excluded.series_id,
                season_number = excluded.season_number,
                episode_number = excluded.episode_number",
            params![
                episode.id,
                episode.series_id,
                episode.season_number,
                episode.episode_number,
            ],
        )?;
        Ok(())
    }

    fn get_series(&self, id: SeriesId) -> AppResult<Option<Series>> {
        let conn = self.pool.get()?;

        let title: Option<String> = conn
            .query_row(
                "SELECT title FROM series WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(title) = title else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT genre FROM series_genres WHERE series_id = ?1 ORDER BY genre")?;
        let genres = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Series { id, title, genres }))
    }

    fn get_episode(&self, id: EpisodeId) -> AppResult<Option<Episode>> {
        let conn = self.pool.get()?;
        let episode = conn
            .query_row(
                "SELECT id, series_id, season_number, episode_number FROM episodes WHERE id = ?1",
                params![id],
                Self::row_to_episode,
            )
            .optional()?;
        Ok(episode)
    }

    fn list_episodes(&self, series_id: SeriesId) -> AppResult<Vec<Episode>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, series_id, season_number, episode_number FROM episodes
             WHERE series_id = ?1
             ORDER BY season_number, episode_number",
        )?;

        let episodes = stmt
            .query_map(params![series_id], Self::row_to_episode)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(episodes)
    }

    fn count_episodes(&self, series_id: SeriesId) -> AppResult<u32> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM episodes WHERE series_id = ?1",
            params![series_id],
            |row| row.get(0),
        )?;
        Ok(to_count(0, count)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, initialize_database};

    fn repo() -> SqliteCatalogRepository {
        let pool = Arc::new(create_memory_pool().unwrap());
        initialize_database(&pool.get().unwrap()).unwrap();
        SqliteCatalogRepository::new(pool)
    }

    #[test]
    fn test_series_round_trip_with_genres() {
        let repo = repo();
        let series = Series::new(
            1,
            "Breaking Bad",
            vec!["Crime".to_string(), "Drama".to_string()],
        );
        repo.save_series(&series).unwrap();

        assert_eq!(repo.get_series(1).unwrap(), Some(series));
        assert_eq!(repo.get_series(2).unwrap(), None);
    }

    #[test]
    fn test_resaving_series_replaces_genres() {
        let repo = repo();
        repo.save_series(&Series::new(1, "Show", vec!["Comedy".to_string()]))
            .unwrap();
        repo.save_series(&Series::new(1, "Show", vec!["Drama".to_string()]))
            .unwrap();

        let series = repo.get_series(1).unwrap().unwrap();
        assert_eq!(series.genres, vec!["Drama".to_string()]);
    }

    #[test]
    fn test_episode_listing_is_ordered_and_counted() {
        let repo = repo();
        repo.save_series(&Series::new(1, "Show", vec![])).unwrap();
        repo.save_episode(&Episode::new(12, 1, 2, 1)).unwrap();
        repo.save_episode(&Episode::new(11, 1, 1, 2)).unwrap();
        repo.save_episode(&Episode::new(10, 1, 1, 1)).unwrap();

        let ids: Vec<EpisodeId> = repo.list_episodes(1).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(repo.count_episodes(1).unwrap(), 3);
        assert_eq!(repo.count_episodes(2).unwrap(), 0);
        assert_eq!(repo.get_episode(11).unwrap(), Some(Episode::new(11, 1, 1, 2)));
    }
}
