//! Catalog client used when no API key is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use mediadex_common::MediaKind;

use crate::metadata::provider::{CatalogClient, CatalogError, EpisodeDetails, MovieMatch, ShowMatch};

/// Answers every call with [`CatalogError::NotConfigured`], so ingestion
/// still runs and every item gets a fallback record.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClient;

#[async_trait]
impl CatalogClient for OfflineClient {
    async fn search_movie(&self, _: &str, _: Option<i32>) -> Result<Vec<MovieMatch>, CatalogError> {
        Err(CatalogError::NotConfigured)
    }

    async fn search_tv(&self, _: &str) -> Result<Vec<ShowMatch>, CatalogError> {
        Err(CatalogError::NotConfigured)
    }

    async fn episode_details(
        &self,
        _: &str,
        _: u32,
        _: u32,
    ) -> Result<Option<EpisodeDetails>, CatalogError> {
        Err(CatalogError::NotConfigured)
    }

    async fn genres(&self, _: MediaKind) -> Result<HashMap<u32, String>, CatalogError> {
        Err(CatalogError::NotConfigured)
    }
}
