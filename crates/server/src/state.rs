//! Shared handler state.
//!
//! Collaborators are built once at startup and injected into each handler
//! service; the search cache is the only mutable piece shared between them.

use crate::routes::download::DownloadStreamer;
use crate::routes::search::SearchGateway;
use crate::routes::verify::DownloadVerifier;
use assetgate_client::{ApiClient, ApiConfig, ApiError};
use assetgate_core::{AppConfig, Clock, FallbackDataset, FileFallback, SearchCache};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub search: Arc<SearchGateway>,
    pub verifier: Arc<DownloadVerifier>,
    pub streamer: Arc<DownloadStreamer>,
    pub cache: Arc<SearchCache>,
}

impl AppState {
    pub fn new(client: ApiClient, cache: Arc<SearchCache>, fallback: Arc<FallbackDataset>, config: &AppConfig) -> Self {
        let search = SearchGateway::new(client.clone(), cache.clone(), fallback, config.search_timeout());
        Self {
            search: Arc::new(search),
            verifier: Arc::new(DownloadVerifier::new(client.clone())),
            streamer: Arc::new(DownloadStreamer::new(client)),
            cache,
        }
    }

    /// Build every collaborator from configuration.
    ///
    /// The fallback dataset is read here, once.
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, ApiError> {
        let client = ApiClient::new(ApiConfig::from(config))?;
        let cache = Arc::new(SearchCache::new(config.search_cache_ttl(), clock));
        let fallback = match &config.fallback_path {
            Some(path) => FallbackDataset::load(&FileFallback::new(path)),
            None => FallbackDataset::empty(),
        };

        Ok(Self::new(client, cache, Arc::new(fallback), config))
    }
}
