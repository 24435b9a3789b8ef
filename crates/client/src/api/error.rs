//! Upstream API client error types.

use std::sync::Arc;

/// Errors from the upstream resource API client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// A URL could not be built or parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// The connection to the upstream could not be established.
    #[error("connection failed: {0}")]
    Connect(Arc<reqwest::Error>),

    /// Any other transport failure.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Non-success HTTP status, with the upstream's own message when it sent one.
    #[error("HTTP error: {status}")]
    HttpError { status: u16, message: Option<String> },

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Timeout | ApiError::Connect(_) | ApiError::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connect(Arc::new(err))
        } else {
            ApiError::Network(Arc::new(err))
        }
    }
}
