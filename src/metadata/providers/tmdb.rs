//! TMDB (The Movie Database) catalog client.
//!
//! Implements [`CatalogClient`] against the TMDB v3 REST API.
//!
//! - One request per call; HTTP 429 surfaces as [`CatalogError::RateLimited`].
//! - Requests carry a timeout (30 seconds by default).
//! - Image path fragments are expanded to absolute URLs.

use std::collections::HashMap;

use async_trait::async_trait;
use mediadex_common::MediaKind;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::metadata::provider::{
    CatalogClient, CatalogError, EpisodeDetails, MovieMatch, ShowMatch,
};

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSearchResult {
    id: u64,
    title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvSearchResult {
    id: u64,
    name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisode {
    name: Option<String>,
    overview: Option<String>,
    still_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
    name: String,
}

// ---------------------------------------------------------------------------
// Client implementation
// ---------------------------------------------------------------------------

/// TMDB catalog client.
///
/// # Examples
///
/// ```no_run
/// use mediadex::config::CatalogConfig;
/// use mediadex::metadata::providers::TmdbClient;
///
/// let config = CatalogConfig {
///     api_key: Some("your-api-key".into()),
///     ..CatalogConfig::default()
/// };
/// let client = TmdbClient::new(&config).unwrap();
/// ```
pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
    image_base_url: String,
}

impl TmdbClient {
    /// Build a client from the `[catalog]` config section.
    ///
    /// Fails with [`CatalogError::NotConfigured`] when no API key is set.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(CatalogError::NotConfigured)?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            language: config.language.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue one GET and decode the JSON body.
    ///
    /// Returns `Ok(None)` on 404 so callers can treat "no such entity" as
    /// absence rather than failure.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Option<T>, CatalogError> {
        let url = format!("{}{path}", self.base_url);
        debug!(path, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(CatalogError::RateLimited),
            StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(CatalogError::Status(status.as_u16())),
            _ => {}
        }

        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }

    /// Expand a TMDB image path fragment to an absolute URL.
    fn image_url(&self, path: Option<String>) -> Option<String> {
        path.filter(|p| !p.is_empty())
            .map(|p| format!("{}{p}", self.image_base_url))
    }
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

#[async_trait]
impl CatalogClient for TmdbClient {
    async fn search_movie(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Vec<MovieMatch>, CatalogError> {
        let mut params = vec![("query", title.to_string())];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }

        let body: Option<TmdbSearchResponse<TmdbMovieSearchResult>> =
            self.get_json("/search/movie", &params).await?;

        Ok(body
            .map(|b| b.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| MovieMatch {
                external_id: r.id.to_string(),
                title: r.title.unwrap_or_default(),
                year: parse_year(r.release_date.as_deref()),
                overview: non_empty(r.overview),
                poster_ref: self.image_url(r.poster_path),
                backdrop_ref: self.image_url(r.backdrop_path),
                rating: r.vote_average,
                genre_ids: r.genre_ids,
            })
            .collect())
    }

    async fn search_tv(&self, title: &str) -> Result<Vec<ShowMatch>, CatalogError> {
        let body: Option<TmdbSearchResponse<TmdbTvSearchResult>> = self
            .get_json("/search/tv", &[("query", title.to_string())])
            .await?;

        Ok(body
            .map(|b| b.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| ShowMatch {
                external_id: r.id.to_string(),
                title: r.name.unwrap_or_default(),
                first_air_date: non_empty(r.first_air_date),
                overview: non_empty(r.overview),
                poster_ref: self.image_url(r.poster_path),
                backdrop_ref: self.image_url(r.backdrop_path),
                rating: r.vote_average,
                genre_ids: r.genre_ids,
            })
            .collect())
    }

    async fn episode_details(
        &self,
        show_external_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<EpisodeDetails>, CatalogError> {
        let path = format!("/tv/{show_external_id}/season/{season}/episode/{episode}");
        let body: Option<TmdbEpisode> = self.get_json(&path, &[]).await?;

        Ok(body.map(|e| EpisodeDetails {
            title: non_empty(e.name),
            overview: non_empty(e.overview),
            still_ref: self.image_url(e.still_path),
        }))
    }

    async fn genres(&self, kind: MediaKind) -> Result<HashMap<u32, String>, CatalogError> {
        let path = match kind {
            MediaKind::Movie => "/genre/movie/list",
            MediaKind::Tv => "/genre/tv/list",
        };
        let body: Option<TmdbGenreList> = self.get_json(path, &[]).await?;

        Ok(body
            .map(|b| b.genres)
            .unwrap_or_default()
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect())
    }
}
