//! Concrete catalog client implementations.
//!
//! Each submodule implements the [`CatalogClient`](super::CatalogClient)
//! trait: [`tmdb`] wraps the TMDB v3 API, [`offline`] stands in when no API
//! key is configured.

pub mod offline;
pub mod tmdb;

pub use offline::OfflineClient;
pub use tmdb::TmdbClient;
