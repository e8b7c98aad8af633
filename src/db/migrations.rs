// src/db/migrations.rs
//
// Database schema initialization and migrations
//
// PRINCIPLES:
// - Explicit schema versions
// - No automatic migrations
// - Clear error messages
// - Idempotent operations

use rusqlite::Connection;

use crate::error::{AppError, AppResult};

/// Current schema version of both stores
/// Increment this when adding migrations
const CURRENT_SCHEMA_VERSION: i32 = 1;

const CATALOG_SCHEMA: &str = include_str!("../../schema/catalog.sql");
const RECOMMENDATION_SCHEMA: &str = include_str!("../../schema/recommendation.sql");
const BROKER_SCHEMA: &str = include_str!("../../schema/broker.sql");

/// Initialize the catalog store schema
///
/// Safe to call multiple times (idempotent).
pub fn initialize_database(conn: &Connection) -> AppResult<()> {
    apply_schema(conn, "catalog", CATALOG_SCHEMA)
}

/// Initialize the recommendation-log store schema
pub fn initialize_recommendation_store(conn: &Connection) -> AppResult<()> {
    apply_schema(conn, "recommendation", RECOMMENDATION_SCHEMA)
}

/// Initialize the durable broker store schema
pub fn initialize_broker_store(conn: &Connection) -> AppResult<()> {
    apply_schema(conn, "broker", BROKER_SCHEMA)
}

fn apply_schema(conn: &Connection, store: &str, schema: &str) -> AppResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        conn.execute_batch(schema).map_err(|e| {
            AppError::Other(format!("Failed to apply {} schema: {}", store, e))
        })?;
        set_schema_version(conn, CURRENT_SCHEMA_VERSION)?;
        log::info!("[DB] Applied {} schema v{}", store, CURRENT_SCHEMA_VERSION);
    } else if current_version < CURRENT_SCHEMA_VERSION {
        return Err(AppError::Other(format!(
            "{} schema version {} is outdated. Expected {}. Manual migration required.",
            store, current_version, CURRENT_SCHEMA_VERSION
        )));
    } else if current_version > CURRENT_SCHEMA_VERSION {
        return Err(AppError::Other(format!(
            "{} schema version {} is newer than supported {}. Update the application.",
            store, current_version, CURRENT_SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get current schema version
/// Returns 0 if schema_version table doesn't exist (fresh database)
fn get_schema_version(conn: &Connection) -> AppResult<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;

    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: i32) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Verify database integrity
///
/// Runs SQLite's integrity check. Should be called periodically.
pub fn verify_database_integrity(conn: &Connection) -> AppResult<()> {
    let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    if result != "ok" {
        return Err(AppError::Other(format!(
            "Database integrity check failed: {}",
            result
        )));
    }

    Ok(())
}

/// Get catalog store statistics
///
/// Returns useful info for debugging and monitoring
pub fn get_database_stats(conn: &Connection) -> AppResult<DatabaseStats> {
    let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
    let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;

    let series_count: i64 = conn.query_row("SELECT COUNT(*) FROM series", [], |row| row.get(0))?;
    let episode_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM episodes", [], |row| row.get(0))?;
    let watch_record_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM watch_records", [], |row| row.get(0))?;
    let rating_count: i64 = conn.query_row("SELECT COUNT(*) FROM ratings", [], |row| row.get(0))?;

    Ok(DatabaseStats {
        size_bytes: page_count * page_size,
        page_count,
        page_size,
        series_count,
        episode_count,
        watch_record_count,
        rating_count,
    })
}

/// Catalog store statistics
#[derive(Debug)]
pub struct DatabaseStats {
    pub size_bytes: i64,
    pub page_count: i64,
    pub page_size: i64,
    pub series_count: i64,
    pub episode_count: i64,
    pub watch_record_count: i64,
    pub rating_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_initialize_fresh_database() {
        let conn = test_connection();
        assert_eq!(get_schema_version(&conn).unwrap(), 0);

        initialize_database(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(table_count >= 9, "Expected at least 9 tables, got {}", table_count);
    }

    #[test]
    fn test_initialize_idempotent() {
        let conn = test_connection();
        initialize_database(&conn).unwrap();
        initialize_database(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_incomplete_watch_record_rejected_by_schema() {
        let conn = test_connection();
        initialize_database(&conn).unwrap();
        conn.execute("INSERT INTO series (id, title) VALUES (1, 'Test')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO episodes (id, series_id, season_number, episode_number) VALUES (1, 1, 1, 1)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO watch_records (user_id, episode_id, watched_at, completed)
             VALUES (1, 1, datetime('now'), 0)",
            [],
        );
        assert!(result.is_err(), "CHECK constraint should have been violated");
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = test_connection();
        initialize_database(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO episodes (id, series_id, season_number, episode_number) VALUES (1, 999, 1, 1)",
            [],
        );
        assert!(result.is_err(), "Foreign key constraint should have been violated");
    }

    #[test]
    fn test_recommendation_store_schema() {
        let conn = test_connection();
        initialize_recommendation_store(&conn).unwrap();
        initialize_recommendation_store(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM recommendation_log", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_database_stats_and_integrity() {
        let conn = test_connection();
        initialize_database(&conn).unwrap();

        let stats = get_database_stats(&conn).unwrap();
        assert!(stats.size_bytes > 0);
        assert_eq!(stats.series_count, 0);
        assert_eq!(stats.watch_record_count, 0);

        verify_database_integrity(&conn).unwrap();
    }
}
