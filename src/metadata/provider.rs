//! Trait definition and types for the external catalog.
//!
//! The resolver talks to the catalog exclusively through [`CatalogClient`];
//! [`TmdbClient`](super::providers::TmdbClient) is the production
//! implementation and tests substitute their own.

use std::collections::HashMap;

use async_trait::async_trait;
use mediadex_common::MediaKind;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure talking to the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog answered HTTP 429.
    #[error("catalog rate limit exceeded")]
    RateLimited,

    /// Any other non-success status.
    #[error("catalog returned HTTP {0}")]
    Status(u16),

    /// Connection failure or request timeout.
    #[error("catalog request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("could not decode catalog response: {0}")]
    Decode(String),

    /// No API key was configured.
    #[error("catalog client is not configured")]
    NotConfigured,
}

impl CatalogError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A movie search hit, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieMatch {
    pub external_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub overview: Option<String>,
    /// Absolute poster URL.
    pub poster_ref: Option<String>,
    /// Absolute backdrop URL.
    pub backdrop_ref: Option<String>,
    pub rating: Option<f64>,
    pub genre_ids: Vec<u32>,
}

/// A TV show search hit, best match first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowMatch {
    pub external_id: String,
    pub title: String,
    pub first_air_date: Option<String>,
    pub overview: Option<String>,
    pub poster_ref: Option<String>,
    pub backdrop_ref: Option<String>,
    pub rating: Option<f64>,
    pub genre_ids: Vec<u32>,
}

/// Per-episode details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeDetails {
    pub title: Option<String>,
    pub overview: Option<String>,
    /// Absolute still-image URL.
    pub still_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Async interface to the external catalog.
///
/// Implementations perform exactly one outbound request per call and never
/// retry on their own; pacing and the rate-limit retry live in the resolver.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Search for movies matching `title`, optionally constrained by `year`.
    async fn search_movie(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Vec<MovieMatch>, CatalogError>;

    /// Search for TV shows matching `title`.
    async fn search_tv(&self, title: &str) -> Result<Vec<ShowMatch>, CatalogError>;

    /// Fetch one episode of a show. `Ok(None)` when the catalog has no such episode.
    async fn episode_details(
        &self,
        show_external_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<EpisodeDetails>, CatalogError>;

    /// Genre id to name table for one media kind.
    async fn genres(&self, kind: MediaKind) -> Result<HashMap<u32, String>, CatalogError>;
}
