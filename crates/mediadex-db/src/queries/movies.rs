//! Movie database queries.
//!
//! Movies are keyed solely by file path.

use mediadex_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension};

use super::{db_err, parse_timestamp};
use crate::models::Movie;

const MOVIE_COLUMNS: &str = "file_path, file_name, title, year, external_id, poster_ref,
     backdrop_ref, overview, rating, genres, added_at";

fn parse_movie_row(row: &rusqlite::Row) -> rusqlite::Result<Movie> {
    Ok(Movie {
        file_path: row.get(0)?,
        file_name: row.get(1)?,
        title: row.get(2)?,
        year: row.get(3)?,
        external_id: row.get(4)?,
        poster_ref: row.get(5)?,
        backdrop_ref: row.get(6)?,
        overview: row.get(7)?,
        rating: row.get(8)?,
        genres: row.get(9)?,
        added_at: parse_timestamp(10, &row.get::<_, String>(10)?)?,
    })
}

/// Insert a movie if its path is not yet indexed anywhere in the catalog.
///
/// # Returns
///
/// * `Ok(true)` - The row was inserted
/// * `Ok(false)` - The path already exists as a movie or an episode
pub fn insert_movie(conn: &Connection, movie: &Movie) -> Result<bool> {
    let rows = conn
        .execute(
            "INSERT INTO movies (file_path, file_name, title, year, external_id, poster_ref,
                                 backdrop_ref, overview, rating, genres, added_at)
             SELECT :file_path, :file_name, :title, :year, :external_id, :poster_ref,
                    :backdrop_ref, :overview, :rating, :genres, :added_at
             WHERE NOT EXISTS (SELECT 1 FROM episodes WHERE file_path = :file_path)
             ON CONFLICT(file_path) DO NOTHING",
            rusqlite::named_params! {
                ":file_path": movie.file_path,
                ":file_name": movie.file_name,
                ":title": movie.title,
                ":year": movie.year,
                ":external_id": movie.external_id,
                ":poster_ref": movie.poster_ref,
                ":backdrop_ref": movie.backdrop_ref,
                ":overview": movie.overview,
                ":rating": movie.rating,
                ":genres": movie.genres,
                ":added_at": movie.added_at.to_rfc3339(),
            },
        )
        .map_err(db_err)?;

    Ok(rows > 0)
}

/// Get a movie by file path.
pub fn get_movie(conn: &Connection, file_path: &str) -> Result<Option<Movie>> {
    conn.query_row(
        &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE file_path = :path"),
        rusqlite::named_params! { ":path": file_path },
        parse_movie_row,
    )
    .optional()
    .map_err(db_err)
}

/// List all movies ordered by title.
pub fn list_movies(conn: &Connection) -> Result<Vec<Movie>> {
    query_movies(
        conn,
        &format!("SELECT {MOVIE_COLUMNS} FROM movies ORDER BY title, file_path"),
    )
}

/// List movies that never received a catalog match.
pub fn list_movies_missing_metadata(conn: &Connection) -> Result<Vec<Movie>> {
    query_movies(
        conn,
        &format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE external_id IS NULL ORDER BY file_path"
        ),
    )
}

fn query_movies(conn: &Connection, sql: &str) -> Result<Vec<Movie>> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let movies = stmt
        .query_map([], parse_movie_row)
        .map_err(db_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_err)?;
    Ok(movies)
}

/// Overwrite the metadata columns of an existing movie.
///
/// `file_path`, `file_name` and `added_at` are never changed.
pub fn update_movie_metadata(conn: &Connection, movie: &Movie) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE movies SET title = :title, year = :year, external_id = :external_id,
                    poster_ref = :poster_ref, backdrop_ref = :backdrop_ref,
                    overview = :overview, rating = :rating, genres = :genres
             WHERE file_path = :file_path",
            rusqlite::named_params! {
                ":file_path": movie.file_path,
                ":title": movie.title,
                ":year": movie.year,
                ":external_id": movie.external_id,
                ":poster_ref": movie.poster_ref,
                ":backdrop_ref": movie.backdrop_ref,
                ":overview": movie.overview,
                ":rating": movie.rating,
                ":genres": movie.genres,
            },
        )
        .map_err(db_err)?;

    if rows == 0 {
        return Err(Error::not_found(format!("movie {}", movie.file_path)));
    }
    Ok(())
}

/// Delete a movie by file path.
pub fn delete_movie(conn: &Connection, file_path: &str) -> Result<bool> {
    let rows = conn
        .execute(
            "DELETE FROM movies WHERE file_path = :path",
            rusqlite::named_params! { ":path": file_path },
        )
        .map_err(db_err)?;
    Ok(rows > 0)
}
