//! Identity, insertion, and duplicate merging for catalog rows.
//!
//! Movies are keyed by file path alone. Shows are matched by external id
//! first and exact title second; those are the only two identity keys. When
//! a later refresh discovers that two shows share an external id, the newer
//! one is folded into the one already holding it.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use mediadex_common::{paths::normalize, Error, Result, ShowId};
use mediadex_db::{
    models::{Episode, Movie, Show},
    pool::{get_conn, DbPool},
    queries::{catalog, episodes, movies, shows},
};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::events::{CatalogEvent, EventBus};
use crate::metadata::{MetadataResolver, MovieRecord, ShowRecord};
use crate::scanner::classifier::Classification;

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Added,
    AlreadyIndexed,
}

/// Result of [`MergeEngine::refresh_missing_metadata`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshReport {
    pub movies_updated: usize,
    pub shows_updated: usize,
    pub shows_merged: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Writes resolved metadata into the catalog.
pub struct MergeEngine {
    pool: DbPool,
    resolver: Arc<MetadataResolver>,
    events: Arc<EventBus>,
}

impl MergeEngine {
    pub fn new(pool: DbPool, resolver: Arc<MetadataResolver>, events: Arc<EventBus>) -> Self {
        Self {
            pool,
            resolver,
            events,
        }
    }

    /// Ingest one classified file.
    ///
    /// An already-indexed path returns [`IngestOutcome::AlreadyIndexed`]
    /// without any catalog lookup.
    pub async fn ingest(&self, path: &Path, classification: &Classification) -> Result<IngestOutcome> {
        match classification {
            Classification::Movie => self.ingest_movie(path).await,
            Classification::Episode {
                show,
                season,
                episode,
            } => self.ingest_episode(path, show, *season, *episode).await,
        }
    }

    async fn ingest_movie(&self, path: &Path) -> Result<IngestOutcome> {
        let file_path = path_string(path);
        if self.is_indexed(&file_path)? {
            return Ok(IngestOutcome::AlreadyIndexed);
        }

        let file_name = file_name(path);
        let record = self.resolver.resolve_movie(&file_name).await;

        let movie = Movie {
            file_path,
            file_name,
            title: record.title,
            year: record.year,
            external_id: record.external_id,
            poster_ref: record.poster_ref,
            backdrop_ref: record.backdrop_ref,
            overview: record.overview,
            rating: record.rating,
            genres: record.genres,
            added_at: Utc::now(),
        };

        let conn = get_conn(&self.pool)?;
        if movies::insert_movie(&conn, &movie)? {
            info!(path = %movie.file_path, title = %movie.title, "Added movie");
            Ok(IngestOutcome::Added)
        } else {
            Ok(IngestOutcome::AlreadyIndexed)
        }
    }

    async fn ingest_episode(
        &self,
        path: &Path,
        show_name: &str,
        season: u32,
        episode: u32,
    ) -> Result<IngestOutcome> {
        let file_path = path_string(path);
        if self.is_indexed(&file_path)? {
            return Ok(IngestOutcome::AlreadyIndexed);
        }

        let show_record = self.resolver.resolve_show(show_name).await;
        let details = self
            .resolver
            .resolve_episode(show_record.external_id.as_deref(), season, episode)
            .await;

        // A new show and its first episode are written together, so a failed
        // or skipped episode insert never leaves an empty show behind.
        let conn = get_conn(&self.pool)?;
        let tx = conn.unchecked_transaction().map_err(sql_err)?;
        let show_id = find_or_create_show(&tx, &show_record)?;

        let row = Episode {
            file_path,
            show_id,
            season_number: to_db_number(season)?,
            episode_number: to_db_number(episode)?,
            title: details.title,
            overview: details.overview,
            still_ref: details.still_ref,
            added_at: Utc::now(),
        };

        if !episodes::insert_episode(&tx, &row)? {
            return Ok(IngestOutcome::AlreadyIndexed);
        }
        tx.commit().map_err(sql_err)?;

        info!(
            path = %row.file_path,
            show = %show_record.title,
            season,
            episode,
            "Added episode"
        );
        Ok(IngestOutcome::Added)
    }

    /// Re-resolve every movie and show that never got a catalog match.
    ///
    /// A show whose fresh external id already belongs to another show is
    /// merged into that show, which survives.
    pub async fn refresh_missing_metadata(&self) -> Result<RefreshReport> {
        let mut report = RefreshReport::default();

        let (pending_movies, pending_shows) = {
            let conn = get_conn(&self.pool)?;
            (
                movies::list_movies_missing_metadata(&conn)?,
                shows::list_shows_missing_metadata(&conn)?,
            )
        };
        info!(
            movies = pending_movies.len(),
            shows = pending_shows.len(),
            "Refreshing items without catalog metadata"
        );

        for movie in pending_movies {
            let record = self.resolver.resolve_movie(&movie.file_name).await;
            if record.external_id.is_none() {
                continue;
            }
            match self.apply_movie_record(movie, record) {
                Ok(()) => report.movies_updated += 1,
                Err(e) => report.errors.push(e.to_string()),
            }
        }

        for show in pending_shows {
            let record = self.resolver.resolve_show(&show.title).await;
            let Some(external_id) = record.external_id.clone() else {
                continue;
            };

            let outcome = get_conn(&self.pool).and_then(|conn| {
                match shows::find_by_external_id(&conn, &external_id)? {
                    Some(owner) if owner.id != show.id => {
                        shows::merge_into(&conn, show.id, owner.id)?;
                        Ok(Some(owner.id))
                    }
                    _ => {
                        update_show_from_record(&conn, &show, &record)?;
                        Ok(None)
                    }
                }
            });

            match outcome {
                Ok(Some(surviving)) => {
                    info!(
                        removed = %show.id,
                        surviving = %surviving,
                        external_id = %external_id,
                        "Merged duplicate show"
                    );
                    self.events.emit(CatalogEvent::ShowsMerged {
                        surviving,
                        removed: show.id,
                    });
                    report.shows_merged += 1;
                }
                Ok(None) => report.shows_updated += 1,
                Err(e) => {
                    warn!(show = %show.title, error = %e, "Failed to refresh show");
                    report.errors.push(format!("{}: {e}", show.title));
                }
            }
        }

        Ok(report)
    }

    fn apply_movie_record(&self, movie: Movie, record: MovieRecord) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        let updated = Movie {
            title: record.title,
            year: record.year.or(movie.year),
            external_id: record.external_id,
            poster_ref: record.poster_ref,
            backdrop_ref: record.backdrop_ref,
            overview: record.overview,
            rating: record.rating,
            genres: record.genres,
            ..movie
        };
        movies::update_movie_metadata(&conn, &updated)
    }

    fn is_indexed(&self, file_path: &str) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        let known = catalog::path_exists(&conn, file_path)?;
        if known {
            debug!(path = file_path, "Already indexed");
        }
        Ok(known)
    }
}

/// Find the show a record belongs to, creating it when neither identity key matches.
fn find_or_create_show(conn: &Connection, record: &ShowRecord) -> Result<ShowId> {
    if let Some(external_id) = record.external_id.as_deref() {
        if let Some(existing) = shows::find_by_external_id(conn, external_id)? {
            return Ok(existing.id);
        }
    }

    if let Some(existing) = shows::find_by_title(conn, &record.title)? {
        if existing.external_id.is_none() && record.external_id.is_some() {
            update_show_from_record(conn, &existing, record)?;
        }
        return Ok(existing.id);
    }

    let show = Show {
        id: ShowId::new(),
        title: record.title.clone(),
        external_id: record.external_id.clone(),
        poster_ref: record.poster_ref.clone(),
        backdrop_ref: record.backdrop_ref.clone(),
        overview: record.overview.clone(),
        rating: record.rating,
        genres: record.genres.clone(),
        first_air_date: record.first_air_date.clone(),
        added_at: Utc::now(),
    };

    insert_or_reuse_show(conn, &show)
}

/// Insert `show`; if another writer got there first, reuse the row that
/// holds its title or external id.
fn insert_or_reuse_show(conn: &Connection, show: &Show) -> Result<ShowId> {
    match shows::insert_show(conn, show) {
        Ok(()) => {
            info!(show = %show.title, id = %show.id, "Created show");
            Ok(show.id)
        }
        Err(e) if e.is_conflict() => {
            debug!(show = %show.title, "Show insert conflicted, re-querying");
            if let Some(existing) = shows::find_by_title(conn, &show.title)? {
                return Ok(existing.id);
            }
            if let Some(external_id) = show.external_id.as_deref() {
                if let Some(existing) = shows::find_by_external_id(conn, external_id)? {
                    return Ok(existing.id);
                }
            }
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Copy resolved metadata onto an existing show.
///
/// The title is only replaced when no other show already uses it.
fn update_show_from_record(conn: &Connection, show: &Show, record: &ShowRecord) -> Result<()> {
    let title = match shows::find_by_title(conn, &record.title)? {
        Some(other) if other.id != show.id => show.title.clone(),
        _ => record.title.clone(),
    };

    let updated = Show {
        id: show.id,
        title,
        external_id: record.external_id.clone(),
        poster_ref: record.poster_ref.clone(),
        backdrop_ref: record.backdrop_ref.clone(),
        overview: record.overview.clone(),
        rating: record.rating,
        genres: record.genres.clone(),
        first_air_date: record.first_air_date.clone(),
        added_at: show.added_at,
    };
    shows::update_show(conn, &updated)
}

fn sql_err(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}

fn to_db_number(n: u32) -> Result<i32> {
    i32::try_from(n).map_err(|_| Error::invalid_input(format!("number out of range: {n}")))
}

/// Catalog key for a file: the normalized path text.
fn path_string(path: &Path) -> String {
    normalize(path).to_string_lossy().into_owned()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_string(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediadex_db::pool::init_memory_pool;

    fn record(title: &str, external_id: Option<&str>) -> ShowRecord {
        ShowRecord {
            title: title.to_string(),
            external_id: external_id.map(str::to_string),
            ..ShowRecord::default()
        }
    }

    fn show(title: &str, external_id: Option<&str>) -> Show {
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

    #[test]
    fn creates_show_when_nothing_matches() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let id = find_or_create_show(&conn, &record("Lost", Some("4607"))).unwrap();
        let stored = shows::get_show(&conn, id).unwrap().unwrap();
        assert_eq!(stored.title, "Lost");
        assert_eq!(stored.external_id.as_deref(), Some("4607"));
    }

    #[test]
    fn insert_race_on_title_reuses_the_winner() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        // Another writer created "Lost" after our lookup missed it.
        let winner = show("Lost", None);
        shows::insert_show(&conn, &winner).unwrap();

        let id = insert_or_reuse_show(&conn, &show("Lost", Some("4607"))).unwrap();
        assert_eq!(id, winner.id);
        assert_eq!(shows::list_shows(&conn).unwrap().len(), 1);
    }

    #[test]
    fn insert_race_on_external_id_reuses_the_winner() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let winner = show("Lost (2004)", Some("4607"));
        shows::insert_show(&conn, &winner).unwrap();

        let id = insert_or_reuse_show(&conn, &show("Lost", Some("4607"))).unwrap();
        assert_eq!(id, winner.id);
        assert_eq!(shows::list_shows(&conn).unwrap().len(), 1);
    }

    #[test]
    fn unresolvable_conflict_is_returned() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let existing = show("Castle", None);
        shows::insert_show(&conn, &existing).unwrap();

        // Same id, different identity keys: neither re-query finds a match.
        let clash = Show {
            title: "Firefly".to_string(),
            ..existing.clone()
        };
        let err = insert_or_reuse_show(&conn, &clash).unwrap_err();
        assert!(err.is_conflict());
        assert!(shows::find_by_title(&conn, "Firefly").unwrap().is_none());
    }

    #[test]
    fn title_match_gains_missing_external_id() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let bare = show("Lost", None);
        shows::insert_show(&conn, &bare).unwrap();

        let id = find_or_create_show(&conn, &record("Lost", Some("4607"))).unwrap();
        assert_eq!(id, bare.id);
        assert_eq!(
            shows::get_show(&conn, id).unwrap().unwrap().external_id.as_deref(),
            Some("4607")
        );
    }
}
