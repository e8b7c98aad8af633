// src/repositories/row.rs
//
// Column conversion helpers shared by the SQLite repositories.
// Parse failures are explicit errors, never silent defaults.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

fn invalid_data(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

/// RFC 3339 text column to UTC timestamp
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid_data(idx, format!("Invalid timestamp '{}': {}", raw, e)))
}

/// Text column parsed through `FromStr`
pub(crate) fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| invalid_data(idx, format!("Invalid value '{}': {}", raw, e)))
}

/// Non-negative integer column to u32
pub(crate) fn to_count(idx: usize, value: i64) -> rusqlite::Result<u32> {
    u32::try_from(value).map_err(|_| invalid_data(idx, format!("Invalid count {}", value)))
}
