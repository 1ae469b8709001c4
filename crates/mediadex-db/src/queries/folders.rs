//! Watched folder registry queries.
//!
//! Folders are returned in registration order.

use chrono::Utc;
use mediadex_common::{ContentHint, Error, FolderId, Result};
use rusqlite::{Connection, OptionalExtension};

use super::{db_err, parse_timestamp, parse_uuid};
use crate::models::WatchedFolder;

fn parse_folder_row(row: &rusqlite::Row) -> rusqlite::Result<WatchedFolder> {
    let content: String = row.get(2)?;
    Ok(WatchedFolder {
        id: FolderId::from(parse_uuid(0, &row.get::<_, String>(0)?)?),
        path: row.get(1)?,
        content: content.parse().unwrap_or_default(),
        added_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
    })
}

/// Register a new watched folder.
///
/// # Returns
///
/// * `Ok(WatchedFolder)` - The registered folder
/// * `Err(Error::Conflict)` - If the path is already registered
pub fn add_folder(conn: &Connection, path: &str, content: ContentHint) -> Result<WatchedFolder> {
    let folder = WatchedFolder {
        id: FolderId::new(),
        path: path.to_string(),
        content,
        added_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO watched_folders (id, path, content, added_at)
         VALUES (:id, :path, :content, :added_at)",
        rusqlite::named_params! {
            ":id": folder.id.to_string(),
            ":path": folder.path,
            ":content": folder.content.to_string(),
            ":added_at": folder.added_at.to_rfc3339(),
        },
    )
    .map_err(db_err)?;

    Ok(folder)
}

/// Register a folder unless it is already present; returns the stored row.
pub fn ensure_folder(conn: &Connection, path: &str, content: ContentHint) -> Result<WatchedFolder> {
    if let Some(existing) = get_folder_by_path(conn, path)? {
        return Ok(existing);
    }
    match add_folder(conn, path, content) {
        Ok(folder) => Ok(folder),
        Err(e) if e.is_conflict() => get_folder_by_path(conn, path)?
            .ok_or_else(|| Error::internal(format!("folder vanished after conflict: {path}"))),
        Err(e) => Err(e),
    }
}

/// Get a folder by its exact path.
pub fn get_folder_by_path(conn: &Connection, path: &str) -> Result<Option<WatchedFolder>> {
    conn.query_row(
        "SELECT id, path, content, added_at FROM watched_folders WHERE path = :path",
        rusqlite::named_params! { ":path": path },
        parse_folder_row,
    )
    .optional()
    .map_err(db_err)
}

/// List all registered folders in registration order.
pub fn list_folders(conn: &Connection) -> Result<Vec<WatchedFolder>> {
    let mut stmt = conn
        .prepare("SELECT id, path, content, added_at FROM watched_folders ORDER BY rowid")
        .map_err(db_err)?;

    let folders = stmt
        .query_map([], parse_folder_row)
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(folders)
}

/// Remove a folder from the registry. Catalog rows are left untouched.
///
/// # Returns
///
/// * `Ok(true)` - If the folder was removed
/// * `Ok(false)` - If no folder had that path
pub fn remove_folder(conn: &Connection, path: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM watched_folders WHERE path = :path",
            rusqlite::named_params! { ":path": path },
        )
        .map_err(db_err)?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};

    #[test]
    fn test_add_and_list_preserves_order() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        add_folder(&conn, "/media/tv", ContentHint::Tv).unwrap();
        add_folder(&conn, "/media/movies", ContentHint::Movies).unwrap();
        add_folder(&conn, "/media/all", ContentHint::Mixed).unwrap();

        let paths: Vec<String> = list_folders(&conn)
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(paths, vec!["/media/tv", "/media/movies", "/media/all"]);
    }

    #[test]
    fn test_duplicate_path_conflicts() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        add_folder(&conn, "/media", ContentHint::Mixed).unwrap();
        let err = add_folder(&conn, "/media", ContentHint::Movies).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_ensure_folder_is_idempotent() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let first = ensure_folder(&conn, "/media", ContentHint::Tv).unwrap();
        let second = ensure_folder(&conn, "/media", ContentHint::Movies).unwrap();
        assert_eq!(first, second);
        assert_eq!(list_folders(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_folder() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        add_folder(&conn, "/media", ContentHint::Mixed).unwrap();
        assert!(remove_folder(&conn, "/media").unwrap());
        assert!(!remove_folder(&conn, "/media").unwrap());
        assert!(get_folder_by_path(&conn, "/media").unwrap().is_none());
    }
}
