//! Show database queries.
//!
//! A show is identified first by `external_id`, then by exact `title`. Both
//! columns are unique; `external_id` may be NULL on any number of rows.

use mediadex_common::{Error, Result, ShowId};
use rusqlite::{Connection, OptionalExtension};

use super::{db_err, parse_timestamp, parse_uuid};
use crate::models::Show;

const SHOW_COLUMNS: &str = "id, title, external_id, poster_ref, backdrop_ref, overview,
     rating, genres, first_air_date, added_at";

fn parse_show_row(row: &rusqlite::Row) -> rusqlite::Result<Show> {
    Ok(Show {
        id: ShowId::from(parse_uuid(0, &row.get::<_, String>(0)?)?),
        title: row.get(1)?,
        external_id: row.get(2)?,
        poster_ref: row.get(3)?,
        backdrop_ref: row.get(4)?,
        overview: row.get(5)?,
        rating: row.get(6)?,
        genres: row.get(7)?,
        first_air_date: row.get(8)?,
        added_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
    })
}

/// Insert a new show.
///
/// # Returns
///
/// * `Ok(())` - The row was inserted
/// * `Err(Error::Conflict)` - The title or external id already belongs to another show
pub fn insert_show(conn: &Connection, show: &Show) -> Result<()> {
    conn.execute(
        "INSERT INTO shows (id, title, external_id, poster_ref, backdrop_ref, overview,
                            rating, genres, first_air_date, added_at)
         VALUES (:id, :title, :external_id, :poster_ref, :backdrop_ref, :overview,
                 :rating, :genres, :first_air_date, :added_at)",
        rusqlite::named_params! {
            ":id": show.id.to_string(),
            ":title": show.title,
            ":external_id": show.external_id,
            ":poster_ref": show.poster_ref,
            ":backdrop_ref": show.backdrop_ref,
            ":overview": show.overview,
            ":rating": show.rating,
            ":genres": show.genres,
            ":first_air_date": show.first_air_date,
            ":added_at": show.added_at.to_rfc3339(),
        },
    )
    .map_err(db_err)?;

    Ok(())
}

/// Get a show by ID.
pub fn get_show(conn: &Connection, id: ShowId) -> Result<Option<Show>> {
    conn.query_row(
        &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        parse_show_row,
    )
    .optional()
    .map_err(db_err)
}

/// Find the show owning a catalog external id.
pub fn find_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<Show>> {
    conn.query_row(
        &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE external_id = :external_id"),
        rusqlite::named_params! { ":external_id": external_id },
        parse_show_row,
    )
    .optional()
    .map_err(db_err)
}

/// Find a show by exact title.
pub fn find_by_title(conn: &Connection, title: &str) -> Result<Option<Show>> {
    conn.query_row(
        &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE title = :title"),
        rusqlite::named_params! { ":title": title },
        parse_show_row,
    )
    .optional()
    .map_err(db_err)
}

/// List all shows ordered by title.
pub fn list_shows(conn: &Connection) -> Result<Vec<Show>> {
    query_shows(conn, &format!("SELECT {SHOW_COLUMNS} FROM shows ORDER BY title"))
}

/// List shows that never received a catalog match.
pub fn list_shows_missing_metadata(conn: &Connection) -> Result<Vec<Show>> {
    query_shows(
        conn,
        &format!(
            "SELECT {SHOW_COLUMNS} FROM shows
             WHERE external_id IS NULL
             ORDER BY added_at, title"
        ),
    )
}

fn query_shows(conn: &Connection, sql: &str) -> Result<Vec<Show>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let shows = stmt
        .query_map([], parse_show_row)
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(shows)
}

/// Overwrite every mutable column of a show, keyed by id.
pub fn update_show(conn: &Connection, show: &Show) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE shows SET title = :title, external_id = :external_id,
                    poster_ref = :poster_ref, backdrop_ref = :backdrop_ref,
                    overview = :overview, rating = :rating, genres = :genres,
                    first_air_date = :first_air_date
             WHERE id = :id",
            rusqlite::named_params! {
                ":id": show.id.to_string(),
                ":title": show.title,
                ":external_id": show.external_id,
                ":poster_ref": show.poster_ref,
                ":backdrop_ref": show.backdrop_ref,
                ":overview": show.overview,
                ":rating": show.rating,
                ":genres": show.genres,
                ":first_air_date": show.first_air_date,
            },
        )
        .map_err(db_err)?;

    if rows == 0 {
        return Err(Error::not_found(format!("show {}", show.id)));
    }
    Ok(())
}

/// Delete a show; its episodes go with it (ON DELETE CASCADE).
pub fn delete_show(conn: &Connection, id: ShowId) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM shows WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(db_err)?;
    Ok(rows > 0)
}

/// Collapse `duplicate` into `surviving`.
///
/// Reassigns every episode of `duplicate` to `surviving`, then deletes
/// `duplicate`, inside one transaction. Returns the number of episodes moved.
pub fn merge_into(conn: &Connection, duplicate: ShowId, surviving: ShowId) -> Result<usize> {
    if duplicate == surviving {
        return Err(Error::invalid_input("cannot merge a show into itself"));
    }

    let tx = conn.unchecked_transaction().map_err(db_err)?;

    let exists: bool = tx
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM shows WHERE id = :id)",
            rusqlite::named_params! { ":id": surviving.to_string() },
            |row| row.get(0),
        )
        .map_err(db_err)?;
    if !exists {
        return Err(Error::not_found(format!("show {surviving}")));
    }

    let moved = tx
        .execute(
            "UPDATE episodes SET show_id = :surviving WHERE show_id = :duplicate",
            rusqlite::named_params! {
                ":surviving": surviving.to_string(),
                ":duplicate": duplicate.to_string(),
            },
        )
        .map_err(db_err)?;

    let deleted = tx
        .execute(
            "DELETE FROM shows WHERE id = :id",
            rusqlite::named_params! { ":id": duplicate.to_string() },
        )
        .map_err(db_err)?;
    if deleted == 0 {
        return Err(Error::not_found(format!("show {duplicate}")));
    }

    tx.commit().map_err(db_err)?;
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Episode;
    use crate::pool::{get_conn, init_memory_pool};
    use crate::queries::episodes;
    use chrono::Utc;

    fn sample_show(title: &str, external_id: Option<&str>) -> Show {
        Show {
            id: ShowId::new(),
            title: title.to_string(),
            external_id: external_id.map(str::to_string),
            poster_ref: None,
            backdrop_ref: None,
            overview: None,
            rating: None,
            genres: None,
            first_air_date: None,
            added_at: Utc::now(),
        }
    }

    fn sample_episode(path: &str, show_id: ShowId, episode: i32) -> Episode {
        Episode {
            file_path: path.to_string(),
            show_id,
            season_number: 1,
            episode_number: episode,
            title: None,
            overview: None,
            still_ref: None,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_lookup_by_external_id_and_title() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let show = sample_show("The Wire", Some("1438"));
        insert_show(&conn, &show).unwrap();

        assert_eq!(find_by_external_id(&conn, "1438").unwrap(), Some(show.clone()));
        assert_eq!(find_by_title(&conn, "The Wire").unwrap(), Some(show.clone()));
        assert!(find_by_title(&conn, "the wire").unwrap().is_none());
        assert_eq!(get_show(&conn, show.id).unwrap(), Some(show));
    }

    #[test]
    fn test_duplicate_title_conflicts() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        insert_show(&conn, &sample_show("Dark", None)).unwrap();

        let err = insert_show(&conn, &sample_show("Dark", None)).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_null_external_ids_do_not_conflict() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        insert_show(&conn, &sample_show("A", None)).unwrap();
        insert_show(&conn, &sample_show("B", None)).unwrap();
        assert_eq!(list_shows(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_merge_moves_episodes_and_deletes_duplicate() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let surviving = sample_show("The Office", Some("2316"));
        let duplicate = sample_show("The Office US", None);
        insert_show(&conn, &surviving).unwrap();
        insert_show(&conn, &duplicate).unwrap();

        episodes::insert_episode(&conn, &sample_episode("/tv/a.mkv", surviving.id, 1)).unwrap();
        episodes::insert_episode(&conn, &sample_episode("/tv/b.mkv", duplicate.id, 2)).unwrap();
        episodes::insert_episode(&conn, &sample_episode("/tv/c.mkv", duplicate.id, 3)).unwrap();

        let moved = merge_into(&conn, duplicate.id, surviving.id).unwrap();
        assert_eq!(moved, 2);

        assert!(get_show(&conn, duplicate.id).unwrap().is_none());
        let eps = episodes::list_episodes_for_show(&conn, surviving.id).unwrap();
        assert_eq!(eps.len(), 3);
        assert!(eps.iter().all(|e| e.show_id == surviving.id));
    }

    #[test]
    fn test_merge_into_missing_show_rolls_back() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let duplicate = sample_show("Orphan Risk", None);
        insert_show(&conn, &duplicate).unwrap();
        episodes::insert_episode(&conn, &sample_episode("/tv/x.mkv", duplicate.id, 1)).unwrap();

        let err = merge_into(&conn, duplicate.id, ShowId::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        assert!(get_show(&conn, duplicate.id).unwrap().is_some());
        let ep = episodes::get_episode(&conn, "/tv/x.mkv").unwrap().unwrap();
        assert_eq!(ep.show_id, duplicate.id);
    }

    #[test]
    fn test_delete_show_cascades_episodes() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let show = sample_show("Gone", None);
        insert_show(&conn, &show).unwrap();
        episodes::insert_episode(&conn, &sample_episode("/tv/g.mkv", show.id, 1)).unwrap();

        assert!(delete_show(&conn, show.id).unwrap());
        assert!(episodes::get_episode(&conn, "/tv/g.mkv").unwrap().is_none());
    }

    #[test]
    fn test_missing_metadata_listing() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        insert_show(&conn, &sample_show("Enriched", Some("1"))).unwrap();
        insert_show(&conn, &sample_show("Bare", None)).unwrap();

        let missing = list_shows_missing_metadata(&conn).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].title, "Bare");
    }
}
