//! Streaming retrieval of finished files.

use super::ApiError;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header;

/// Body of a retrieved file, yielded chunk by chunk as it arrives.
pub type FileStream = BoxStream<'static, Result<Bytes, ApiError>>;

/// A file being fetched from its resolved URL.
///
/// Headers are captured up front; the body is not read until the stream is
/// polled.
pub struct RetrievedFile {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub content_disposition: Option<String>,
    pub body: FileStream,
}

impl RetrievedFile {
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let headers = response.headers();
        let header_str = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };

        let content_type = header_str(header::CONTENT_TYPE);
        let content_disposition = header_str(header::CONTENT_DISPOSITION);
        let content_length = response.content_length();

        let body = response
            .bytes_stream()
            .map_err(|e| {
                tracing::warn!(error = %e, "file stream interrupted");
                ApiError::from(e)
            })
            .boxed();

        Self { content_type, content_length, content_disposition, body }
    }
}

impl std::fmt::Debug for RetrievedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievedFile")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("content_disposition", &self.content_disposition)
            .finish_non_exhaustive()
    }
}
