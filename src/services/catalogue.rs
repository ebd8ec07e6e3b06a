use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Queries shorter than this (after trimming) never reach the upstream
pub const MIN_QUERY_LEN: usize = 3;

/// Upper bound on search results, whatever the source returns
pub const MAX_SEARCH_RESULTS: usize = 30;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Game {0} not found in the external catalogue")]
    NotFound(i64),

    #[error("Catalogue credentials are not configured")]
    MissingCredentials,

    #[error("Catalogue request failed: {0}")]
    Upstream(String),

    #[error("Catalogue response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogueError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogueError::Decode(err.to_string())
        } else {
            CatalogueError::Upstream(err.to_string())
        }
    }
}

/// One search hit, already mapped to local field conventions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub id: i64,
    pub name: String,
    pub summary: Option<String>,
    /// `YYYY-MM-DD`
    pub first_release_date: Option<String>,
    pub cover_url: Option<String>,
}

/// Full record for a single external id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullResult {
    pub id: i64,
    pub name: String,
    pub summary: Option<String>,
    pub first_release_date: Option<String>,
    pub cover_url: Option<String>,
    pub franchise: Vec<String>,
    pub studio: Vec<String>,
}

/// A third-party game metadata provider
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SummaryResult>, CatalogueError>;

    /// `Ok(None)` when the provider has no record for `external_id`
    async fn detail(&self, external_id: i64) -> Result<Option<FullResult>, CatalogueError>;
}

/// Search and detail lookups against the configured metadata source
#[derive(Clone)]
pub struct ExternalCatalogue {
    source: Arc<dyn MetadataSource>,
}

impl ExternalCatalogue {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    pub async fn search_by_title(&self, text: &str) -> Result<Vec<SummaryResult>, CatalogueError> {
        let text = text.trim();
        if text.chars().count() < MIN_QUERY_LEN {
            debug!("Skipping catalogue search for short query {:?}", text);
            return Ok(Vec::new());
        }

        let mut results = self.source.search(text, MAX_SEARCH_RESULTS).await?;
        results.truncate(MAX_SEARCH_RESULTS);
        Ok(results)
    }

    pub async fn fetch_detail(&self, external_id: i64) -> Result<FullResult, CatalogueError> {
        self.source
            .detail(external_id)
            .await?
            .ok_or(CatalogueError::NotFound(external_id))
    }
}

impl std::fmt::Debug for ExternalCatalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalCatalogue").finish_non_exhaustive()
    }
}
