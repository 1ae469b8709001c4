//! Cross-table catalog queries.

use mediadex_common::Result;
use rusqlite::Connection;

use super::db_err;
use crate::models::CatalogStats;

/// Check whether a file path is already indexed as a movie or an episode.
pub fn path_exists(conn: &Connection, file_path: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM movies WHERE file_path = :path)
             OR EXISTS(SELECT 1 FROM episodes WHERE file_path = :path)",
        rusqlite::named_params! { ":path": file_path },
        |row| row.get(0),
    )
    .map_err(db_err)
}

/// Row counts for every catalog table.
pub fn stats(conn: &Connection) -> Result<CatalogStats> {
    conn.query_row(
        "SELECT (SELECT COUNT(*) FROM watched_folders),
                (SELECT COUNT(*) FROM movies),
                (SELECT COUNT(*) FROM shows),
                (SELECT COUNT(*) FROM episodes)",
        [],
        |row| {
            Ok(CatalogStats {
                folders: row.get(0)?,
                movies: row.get(1)?,
                shows: row.get(2)?,
                episodes: row.get(3)?,
            })
        },
    )
    .map_err(db_err)
}
