//! Episode database queries.

use mediadex_common::{Result, ShowId};
use rusqlite::{Connection, OptionalExtension};

use super::{db_err, parse_timestamp, parse_uuid};
use crate::models::Episode;

const EPISODE_COLUMNS: &str = "file_path, show_id, season_number, episode_number, title,
     overview, still_ref, added_at";

fn parse_episode_row(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
    Ok(Episode {
        file_path: row.get(0)?,
        show_id: ShowId::from(parse_uuid(1, &row.get::<_, String>(1)?)?),
        season_number: row.get(2)?,
        episode_number: row.get(3)?,
        title: row.get(4)?,
        overview: row.get(5)?,
        still_ref: row.get(6)?,
        added_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
    })
}

/// Insert an episode if its path is not yet indexed anywhere in the catalog.
///
/// # Returns
///
/// * `Ok(true)` - The row was inserted
/// * `Ok(false)` - The path already exists as an episode or a movie
/// * `Err(Error::Conflict)` - The referenced show does not exist
pub fn insert_episode(conn: &Connection, episode: &Episode) -> Result<bool> {
    let rows = conn
        .execute(
            "INSERT INTO episodes (file_path, show_id, season_number, episode_number, title,
                                   overview, still_ref, added_at)
             SELECT :file_path, :show_id, :season, :episode, :title,
                    :overview, :still_ref, :added_at
             WHERE NOT EXISTS (SELECT 1 FROM movies WHERE file_path = :file_path)
             ON CONFLICT(file_path) DO NOTHING",
            rusqlite::named_params! {
                ":file_path": episode.file_path,
                ":show_id": episode.show_id.to_string(),
                ":season": episode.season_number,
                ":episode": episode.episode_number,
                ":title": episode.title,
                ":overview": episode.overview,
                ":still_ref": episode.still_ref,
                ":added_at": episode.added_at.to_rfc3339(),
            },
        )
        .map_err(db_err)?;

    Ok(rows > 0)
}

/// Get an episode by file path.
pub fn get_episode(conn: &Connection, file_path: &str) -> Result<Option<Episode>> {
    conn.query_row(
        &format!("SELECT {EPISODE_COLUMNS} FROM episodes WHERE file_path = :path"),
        rusqlite::named_params! { ":path": file_path },
        parse_episode_row,
    )
    .optional()
    .map_err(db_err)
}

/// List the episodes of a show in season/episode order.
pub fn list_episodes_for_show(conn: &Connection, show_id: ShowId) -> Result<Vec<Episode>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes WHERE show_id = :show_id
             ORDER BY season_number, episode_number, file_path"
        ))
        .map_err(db_err)?;

    let episodes = stmt
        .query_map(
            rusqlite::named_params! { ":show_id": show_id.to_string() },
            parse_episode_row,
        )
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(episodes)
}

/// Delete an episode; the owning show goes too when this was its last episode.
///
/// # Returns
///
/// * `Ok(true)` - If the episode was removed
/// * `Ok(false)` - If no episode had that path
pub fn delete_episode(conn: &Connection, file_path: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction().map_err(db_err)?;

    let show_id: Option<String> = tx
        .query_row(
            "SELECT show_id FROM episodes WHERE file_path = :path",
            rusqlite::named_params! { ":path": file_path },
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;

    let Some(show_id) = show_id else {
        return Ok(false);
    };

    tx.execute(
        "DELETE FROM episodes WHERE file_path = :path",
        rusqlite::named_params! { ":path": file_path },
    )
    .map_err(db_err)?;

    let removed_show = tx
        .execute(
            "DELETE FROM shows WHERE id = :id
             AND NOT EXISTS (SELECT 1 FROM episodes WHERE show_id = :id)",
            rusqlite::named_params! { ":id": show_id },
        )
        .map_err(db_err)?;
    if removed_show > 0 {
        tracing::debug!(show_id = %show_id, "Removed show with no remaining episodes");
    }

    tx.commit().map_err(db_err)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movie, Show};
    use crate::pool::{get_conn, init_memory_pool};
    use crate::queries::{movies, shows};
    use chrono::Utc;

    fn make_show(conn: &Connection, title: &str) -> ShowId {
        let show = Show {
            id: ShowId::new(),
            title: title.to_string(),
            external_id: None,
            poster_ref: None,
            backdrop_ref: None,
            overview: None,
            rating: None,
            genres: None,
            first_air_date: None,
            added_at: Utc::now(),
        };
        shows::insert_show(conn, &show).unwrap();
        show.id
    }

    fn episode(path: &str, show_id: ShowId, season: i32, number: i32) -> Episode {
        Episode {
            file_path: path.to_string(),
            show_id,
            season_number: season,
            episode_number: number,
            title: Some(format!("Episode {number}")),
            overview: None,
            still_ref: None,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_list_ordered() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let show_id = make_show(&conn, "Lost");

        insert_episode(&conn, &episode("/tv/s2e1.mkv", show_id, 2, 1)).unwrap();
        insert_episode(&conn, &episode("/tv/s1e2.mkv", show_id, 1, 2)).unwrap();
        insert_episode(&conn, &episode("/tv/s1e1.mkv", show_id, 1, 1)).unwrap();

        let order: Vec<(i32, i32)> = list_episodes_for_show(&conn, show_id)
            .unwrap()
            .iter()
            .map(|e| (e.season_number, e.episode_number))
            .collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn test_path_already_a_movie_is_skipped() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let show_id = make_show(&conn, "Lost");
        movies::insert_movie(
            &conn,
            &Movie {
                file_path: "/m/x.mkv".to_string(),
                file_name: "x.mkv".to_string(),
                title: "X".to_string(),
                year: None,
                external_id: None,
                poster_ref: None,
                backdrop_ref: None,
                overview: None,
                rating: None,
                genres: None,
                added_at: Utc::now(),
            },
        )
        .unwrap();

        assert!(!insert_episode(&conn, &episode("/m/x.mkv", show_id, 1, 1)).unwrap());
        assert!(get_episode(&conn, "/m/x.mkv").unwrap().is_none());
    }

    #[test]
    fn test_unknown_show_is_rejected() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let err = insert_episode(&conn, &episode("/tv/a.mkv", ShowId::new(), 1, 1)).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_delete_last_episode_removes_show() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let show_id = make_show(&conn, "Short Lived");
        insert_episode(&conn, &episode("/tv/1.mkv", show_id, 1, 1)).unwrap();
        insert_episode(&conn, &episode("/tv/2.mkv", show_id, 1, 2)).unwrap();

        assert!(delete_episode(&conn, "/tv/1.mkv").unwrap());
        assert!(shows::get_show(&conn, show_id).unwrap().is_some());

        assert!(delete_episode(&conn, "/tv/2.mkv").unwrap());
        assert!(shows::get_show(&conn, show_id).unwrap().is_none());

        assert!(!delete_episode(&conn, "/tv/2.mkv").unwrap());
    }
}
