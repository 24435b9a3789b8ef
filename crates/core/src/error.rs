//! Unified error types for assetgate.
//!
//! Every handler failure ends up as one of these variants, and the HTTP status
//! it maps to is decided here and nowhere else.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error types for the assetgate server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Caller input is missing or malformed.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No usable bearer credential on the request.
    #[error("AUTH_REQUIRED: {0}")]
    AuthRequired(String),

    /// The upstream has no record matching the request (e.g. unknown task).
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// The upstream answered with a non-success status.
    #[error("UPSTREAM_ERROR: {message} (status {status})")]
    Upstream { status: u16, message: String },

    /// The upstream answered successfully but rejected the download.
    #[error("VERIFICATION_FAILED: {0}")]
    VerificationFailed(String),

    /// The upstream did not answer before the deadline.
    #[error("TIMEOUT: {0}")]
    Timeout(String),

    /// The upstream could not be reached at all.
    #[error("SERVICE_UNAVAILABLE: {0}")]
    ServiceUnavailable(String),

    /// Fetching the finished file failed after the task reported completion.
    #[error("RETRIEVAL_FAILED: {0}")]
    Retrieval(String),

    /// The upstream job backing a download task failed.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),

    /// Anything else.
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::AuthRequired(_) => "AUTH_REQUIRED",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Upstream { .. } => "UPSTREAM_ERROR",
            Error::VerificationFailed(_) => "VERIFICATION_FAILED",
            Error::Timeout(_) => "TIMEOUT",
            Error::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Error::Retrieval(_) => "RETRIEVAL_FAILED",
            Error::TaskFailed(_) => "TASK_FAILED",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status this error is reported with.
    ///
    /// Upstream errors pass the upstream status through; a status that is not
    /// a valid error code is reported as 502.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidInput(_) | Error::VerificationFailed(_) => StatusCode::BAD_REQUEST,
            Error::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::TaskFailed(_) => StatusCode::BAD_GATEWAY,
            Error::Retrieval(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Error::Upstream { message, .. } => message.clone(),
            Error::InvalidInput(msg)
            | Error::AuthRequired(msg)
            | Error::NotFound(msg)
            | Error::VerificationFailed(msg)
            | Error::Timeout(msg)
            | Error::ServiceUnavailable(msg)
            | Error::Retrieval(msg)
            | Error::TaskFailed(msg)
            | Error::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), status = status.as_u16(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), status = status.as_u16(), "{}", self);
        }

        let body = json!({ "success": false, "code": self.code(), "error": self.message() });
        (status, Json(body)).into_response()
    }
}
