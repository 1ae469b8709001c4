//! Internal Rust models matching the database schema.
//!
//! This module provides strongly-typed Rust structures that map to database tables.
//! All models use types from mediadex-common where appropriate.

use chrono::{DateTime, Utc};
use mediadex_common::{ContentHint, FolderId, ShowId};
use serde::{Deserialize, Serialize};

/// Registered root folder observed by the watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedFolder {
    pub id: FolderId,
    pub path: String,
    pub content: ContentHint,
    pub added_at: DateTime<Utc>,
}

/// A single movie file and its catalog metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub file_path: String,
    pub file_name: String,
    pub title: String,
    pub year: Option<i32>,
    pub external_id: Option<String>,
    pub poster_ref: Option<String>,
    pub backdrop_ref: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    /// Comma-separated genre names.
    pub genres: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A TV show grouping episodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    pub external_id: Option<String>,
    pub poster_ref: Option<String>,
    pub backdrop_ref: Option<String>,
    pub overview: Option<String>,
    pub rating: Option<f64>,
    /// Comma-separated genre names.
    pub genres: Option<String>,
    pub first_air_date: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// A single episode file belonging to a show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub file_path: String,
    pub show_id: ShowId,
    pub season_number: i32,
    pub episode_number: i32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub still_ref: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Row counts across the catalog.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogStats {
    pub folders: i64,
    pub movies: i64,
    pub shows: i64,
    pub episodes: i64,
}
