//! Turns file names and show names into catalog metadata.
//!
//! Every outbound call passes through the shared [`RateLimiter`]. A
//! rate-limit answer waits the configured backoff and is retried exactly
//! once; any other failure degrades to a fallback record carrying only the
//! cleaned title.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mediadex_common::MediaKind;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::provider::{CatalogClient, CatalogError};
use super::rate_limit::RateLimiter;
use super::title::{clean_title, extract_year};

/// Metadata for a movie file. Fallback records only carry `title`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovieRecord {
    pub title: String,
    pub year: Option<i32>,
    pub external_id: Option<String>,
    pub poster_ref: Option<String>,
    pub backdrop_ref: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    pub genres: Option<String>,
}

/// Metadata for a show. Fallback records only carry `title`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShowRecord {
    pub title: String,
    pub external_id: Option<String>,
    pub poster_ref: Option<String>,
    pub backdrop_ref: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    pub genres: Option<String>,
    pub first_air_date: Option<String>,
}

/// Metadata for a single episode; all fields may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeRecord {
    pub title: Option<String>,
    pub overview: Option<String>,
    pub still_ref: Option<String>,
}

/// Rate-limited metadata lookups with fallbacks.
pub struct MetadataResolver {
    client: Arc<dyn CatalogClient>,
    limiter: Arc<RateLimiter>,
    backoff: Duration,
    genre_cache: Mutex<HashMap<MediaKind, Arc<HashMap<u32, String>>>>,
}

impl MetadataResolver {
    pub fn new(client: Arc<dyn CatalogClient>, limiter: Arc<RateLimiter>, backoff: Duration) -> Self {
        Self {
            client,
            limiter,
            backoff,
            genre_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a movie from its file name.
    pub async fn resolve_movie(&self, file_name: &str) -> MovieRecord {
        let title = clean_title(file_name);
        let year = extract_year(file_name);

        let top = match self
            .call("search_movie", || self.client.search_movie(&title, year))
            .await
        {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                warn!(title = %title, error = %e, "Movie lookup failed, using fallback");
                None
            }
        };

        let Some(hit) = top else {
            debug!(title = %title, "No catalog match for movie");
            return MovieRecord {
                title,
                ..MovieRecord::default()
            };
        };

        let genres = self.genre_names(MediaKind::Movie, &hit.genre_ids).await;
        MovieRecord {
            title: if hit.title.trim().is_empty() { title } else { hit.title },
            year: hit.year,
            external_id: Some(hit.external_id),
            poster_ref: hit.poster_ref,
            backdrop_ref: hit.backdrop_ref,
            overview: hit.overview,
            rating: hit.rating,
            genres: Some(genres),
        }
    }

    /// Resolve a show from the name the classifier extracted.
    pub async fn resolve_show(&self, name: &str) -> ShowRecord {
        let title = clean_title(name);

        let top = match self.call("search_tv", || self.client.search_tv(&title)).await {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                warn!(title = %title, error = %e, "Show lookup failed, using fallback");
                None
            }
        };

        let Some(hit) = top else {
            debug!(title = %title, "No catalog match for show");
            return ShowRecord {
                title,
                ..ShowRecord::default()
            };
        };

        let genres = self.genre_names(MediaKind::Tv, &hit.genre_ids).await;
        ShowRecord {
            title: if hit.title.trim().is_empty() { title } else { hit.title },
            external_id: Some(hit.external_id),
            poster_ref: hit.poster_ref,
            backdrop_ref: hit.backdrop_ref,
            overview: hit.overview,
            rating: hit.rating,
            genres: Some(genres),
            first_air_date: hit.first_air_date,
        }
    }

    /// Resolve episode details. Without a show external id nothing is looked up.
    pub async fn resolve_episode(
        &self,
        show_external_id: Option<&str>,
        season: u32,
        episode: u32,
    ) -> EpisodeRecord {
        let Some(show_id) = show_external_id else {
            return EpisodeRecord::default();
        };

        match self
            .call("episode_details", || {
                self.client.episode_details(show_id, season, episode)
            })
            .await
        {
            Ok(Some(details)) => EpisodeRecord {
                title: details.title,
                overview: details.overview,
                still_ref: details.still_ref,
            },
            Ok(None) => EpisodeRecord::default(),
            Err(e) => {
                warn!(show_id, season, episode, error = %e, "Episode lookup failed");
                EpisodeRecord::default()
            }
        }
    }

    /// Names for `ids`, joined with `", "`. Empty when the table is unavailable.
    async fn genre_names(&self, kind: MediaKind, ids: &[u32]) -> String {
        if ids.is_empty() {
            return String::new();
        }

        let cached = self.genre_cache.lock().get(&kind).cloned();
        let table = match cached {
            Some(table) => table,
            None => match self.call("genres", || self.client.genres(kind)).await {
                Ok(table) => {
                    let table = Arc::new(table);
                    self.genre_cache.lock().insert(kind, table.clone());
                    table
                }
                Err(e) => {
                    warn!(%kind, error = %e, "Genre table lookup failed");
                    return String::new();
                }
            },
        };

        ids.iter()
            .filter_map(|id| table.get(id).map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Run one catalog call under the limiter, retrying once on a rate limit.
    async fn call<T, F, Fut>(&self, op: &'static str, request: F) -> Result<T, CatalogError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        self.limiter.acquire().await;
        match request().await {
            Err(CatalogError::RateLimited) => {
                warn!(
                    op,
                    backoff_ms = self.backoff.as_millis() as u64,
                    "Catalog rate limit hit, retrying once"
                );
                self.limiter.sleep(self.backoff).await;
                self.limiter.acquire().await;
                request().await
            }
            other => other,
        }
    }
}
