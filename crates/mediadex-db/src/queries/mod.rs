//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - folders: Watched folder registry
//! - movies: Movie rows keyed by file path
//! - shows: Show rows, identity lookups, and duplicate merges
//! - episodes: Episode rows keyed by file path
//! - catalog: Cross-table path checks and statistics

pub mod catalog;
pub mod episodes;
pub mod folders;
pub mod movies;
pub mod shows;

use chrono::{DateTime, Utc};
use mediadex_common::Error;
use uuid::Uuid;

/// Convert a rusqlite error, surfacing constraint violations as conflicts.
pub(crate) fn db_err(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::conflict(e.to_string())
        }
        _ => Error::database(e.to_string()),
    }
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse a UUID column.
pub(crate) fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
