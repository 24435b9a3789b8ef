//! Keyword search with caching and degraded-mode fallback.
//!
//! A live cache hit is returned without touching the network. On a miss the
//! upstream is called under a deadline; if that fails for any reason the
//! static fallback dataset is served instead, and only when there is none is
//! the failure classified and surfaced.

use crate::state::AppState;
use assetgate_client::{ApiClient, ApiError};
use assetgate_core::{Error, FallbackDataset, SearchCache};
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Page used when the caller does not send one.
const DEFAULT_PAGE: &str = "1";

/// Response header naming where a search payload came from.
pub const SOURCE_HEADER: &str = "x-search-source";

/// Query string for `GET /search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

/// Where a search payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSource {
    Cache,
    Upstream,
    Fallback,
}

impl SearchSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchSource::Cache => "cache",
            SearchSource::Upstream => "upstream",
            SearchSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutput {
    pub payload: Value,
    pub source: SearchSource,
}

/// Search front for the upstream API.
#[derive(Debug)]
pub struct SearchGateway {
    client: ApiClient,
    cache: Arc<SearchCache>,
    fallback: Arc<FallbackDataset>,
    deadline: Duration,
}

impl SearchGateway {
    pub fn new(client: ApiClient, cache: Arc<SearchCache>, fallback: Arc<FallbackDataset>, deadline: Duration) -> Self {
        Self { client, cache, fallback, deadline }
    }

    /// Answer a keyword + page query.
    pub async fn search(&self, query: Option<&str>, page: Option<&str>) -> Result<SearchOutput, Error> {
        let query = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::InvalidInput("Search query is required".into()))?;
        let page = page.map(str::trim).filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PAGE);

        if let Some(payload) = self.cache.get(query, page) {
            tracing::debug!(query, page, "search cache hit");
            return Ok(SearchOutput { payload, source: SearchSource::Cache });
        }

        tracing::debug!(query, page, "search cache miss");

        // Dropping the future on expiry cancels the in-flight request.
        let failure = match tokio::time::timeout(self.deadline, self.client.search(query, page, self.deadline)).await {
            Ok(Ok(payload)) => {
                self.cache.put(query, page, payload.clone());
                return Ok(SearchOutput { payload, source: SearchSource::Upstream });
            }
            Ok(Err(e)) => classify(e),
            Err(_) => Error::Timeout("Search request timed out".into()),
        };

        if let Some(payload) = self.fallback.render(query, page) {
            tracing::warn!(query, page, error = %failure, "upstream search failed, serving fallback dataset");
            return Ok(SearchOutput { payload, source: SearchSource::Fallback });
        }

        tracing::warn!(query, page, error = %failure, "upstream search failed, no fallback dataset");
        Err(failure)
    }
}

fn classify(err: ApiError) -> Error {
    match err {
        ApiError::Timeout => Error::Timeout("Search request timed out".into()),
        ApiError::Connect(_) | ApiError::Network(_) => {
            Error::ServiceUnavailable("Search service is unavailable".into())
        }
        ApiError::HttpError { status, .. } => Error::Internal(format!("Search API returned status {status}")),
        ApiError::Parse(msg) | ApiError::InvalidUrl(msg) => Error::Internal(msg),
    }
}

/// Attach the fixed CORS allow-list.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, OPTIONS"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type, Authorization"));
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
}

/// `GET /search`
///
/// CORS headers go on every response, including query-string rejections.
pub async fn search(State(state): State<AppState>, params: Result<Query<SearchParams>, QueryRejection>) -> Response {
    let result = match params {
        Ok(Query(params)) => state.search.search(params.query.as_deref(), params.page.as_deref()).await,
        Err(rejection) => Err(Error::InvalidInput(rejection.body_text())),
    };
    let mut response = match result {
        Ok(output) => (StatusCode::OK, [(SOURCE_HEADER, output.source.as_str())], Json(output.payload)).into_response(),
        Err(e) => e.into_response(),
    };
    apply_cors(response.headers_mut());
    response
}

/// `OPTIONS /search`
pub async fn preflight() -> Response {
    let mut response = StatusCode::OK.into_response();
    apply_cors(response.headers_mut());
    response
}
