//! Metadata resolution against an external catalog.
//!
//! # Module layout
//!
//! - [`title`] -- Release-name cleanup and year extraction.
//! - [`rate_limit`] -- Minimum-spacing limiter with an injectable clock.
//! - [`provider`] -- Catalog client trait and shared data types.
//! - [`providers`] -- Concrete clients (TMDB, offline).
//! - [`resolver`] -- Rate-limited lookups with fallbacks and genre caching.

pub mod provider;
pub mod providers;
pub mod rate_limit;
pub mod resolver;
pub mod title;

pub use providers::{OfflineClient, TmdbClient};
pub use provider::{CatalogClient, CatalogError, EpisodeDetails, MovieMatch, ShowMatch};
pub use rate_limit::{Clock, RateLimiter, TokioClock};
pub use resolver::{EpisodeRecord, MetadataResolver, MovieRecord, ShowRecord};
