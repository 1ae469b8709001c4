//! Catalog schema setup.
//!
//! The schema lives in `001_initial.sql` and is embedded in the binary.
//! Applying it is recorded in `schema_migrations`, so reopening an existing
//! catalog does nothing, and a catalog written by a newer build is refused.

use rusqlite::Connection;
use thiserror::Error;

/// Version written by this build.
pub const SCHEMA_VERSION: i64 = 1;

const INITIAL_SCHEMA: &str = include_str!("001_initial.sql");

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Catalog schema version {found} is newer than supported version {}", SCHEMA_VERSION)]
    TooNew { found: i64 },
}

/// Create the catalog tables if this database does not have them yet.
///
/// Returns `true` when the schema was applied by this call.
pub fn run_migrations(conn: &Connection) -> Result<bool, MigrationError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_migrations (
             version INTEGER PRIMARY KEY NOT NULL,
             applied_at TEXT NOT NULL DEFAULT (datetime('now'))
         );",
    )?;

    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(MigrationError::TooNew { found });
    }
    if found == SCHEMA_VERSION {
        return Ok(false);
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(INITIAL_SCHEMA)?;
    tx.execute(
        "INSERT INTO schema_migrations (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;
    tx.commit()?;

    tracing::info!(version = SCHEMA_VERSION, "Created catalog schema");
    Ok(true)
}

/// Highest recorded schema version, 0 for an empty database.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}
