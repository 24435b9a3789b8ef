//! Client code for assetgate.
//!
//! This crate provides the HTTP client for the upstream resource API and the
//! filename resolution used when relaying finished files.

pub mod api;
pub mod filename;

pub use api::{
    ApiClient, ApiConfig, ApiError, DownloadTask, FileStream, RetrievedFile, SiteInfo, SubscriptionInfo, TaskStatus,
    TaskStatusPayload, VerificationResult, VerifyPayload, upstream_message,
};
pub use filename::{DEFAULT_FILENAME, content_disposition_header, parse_content_disposition, resolve_filename};
