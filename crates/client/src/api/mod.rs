//! Upstream resource API client.
//!
//! Provides a client for the resource-delivery API behind the gateway:
//! keyword search, download verification, task status and file retrieval.
//!
//! ### Wire contract
//!
//! - **Search**: `GET {base}/search?query=..&page=..`, opaque JSON payload.
//! - **Verify**: `POST {base}/download/verify` with `{"downloadUrl": ..}`.
//! - **Task status**: `GET {base}/download/tasks?taskId=..`.
//! - **Authentication**: the caller's bearer token is forwarded verbatim on
//!   verify and task-status calls. Search is anonymous.
//! - **Retrieval**: finished files are fetched from the task's resolved URL
//!   with a browser user agent and streamed; there is no total timeout on
//!   that request, only a connect timeout.

pub mod error;
pub mod retrieve;
pub mod tasks;
pub mod verify;

pub use error::ApiError;
pub use retrieve::{FileStream, RetrievedFile};
pub use tasks::{DownloadTask, TaskStatus, TaskStatusPayload};
pub use verify::{SiteInfo, SubscriptionInfo, VerificationResult, VerifyPayload};

use assetgate_core::AuthCredential;
use reqwest::{RequestBuilder, Response, header};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default base URL for the upstream API.
const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default connect timeout for file retrieval.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "assetgate/0.1";

/// Message used when a failing upstream gives no reason.
const GENERIC_UPSTREAM_MESSAGE: &str = "Backend service error";

/// Upstream API client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL (default: http://localhost:5000/api).
    pub base_url: String,
    /// Request timeout for verify and task-status calls (default: 20s).
    pub timeout: Duration,
    /// Connect timeout for file retrieval (default: 10s).
    pub connect_timeout: Duration,
    /// User-agent for API calls.
    pub user_agent: String,
    /// User-agent for file retrieval.
    pub download_user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            download_user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl From<&assetgate_core::AppConfig> for ApiConfig {
    fn from(config: &assetgate_core::AppConfig) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            user_agent: config.user_agent.clone(),
            download_user_agent: config.download_user_agent.clone(),
        }
    }
}

/// Upstream resource API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    download_http: reqwest::Client,
    config: Arc<ApiConfig>,
}

impl ApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        url::Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .build()
            .map_err(|e| ApiError::Network(Arc::new(e)))?;

        let download_http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.download_user_agent)
            .use_rustls_tls()
            .build()
            .map_err(|e| ApiError::Network(Arc::new(e)))?;

        Ok(Self { http, download_http, config: Arc::new(config) })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Run a keyword search.
    ///
    /// `deadline` overrides the client-wide timeout for this request.
    pub async fn search(&self, query: &str, page: &str, deadline: Duration) -> Result<Value, ApiError> {
        let start = Instant::now();
        tracing::debug!(query, page, "searching upstream");

        let response = self
            .http
            .get(self.endpoint("search"))
            .header(header::ACCEPT, "application/json")
            .query(&[("query", query), ("page", page)])
            .timeout(deadline)
            .send()
            .await?;

        let response = check_status(response).await?;
        let payload: Value = parse_json(response).await?;

        tracing::debug!("search completed in {:?}", start.elapsed());
        Ok(payload)
    }

    /// Ask the upstream whether `download_url` may be downloaded by the holder
    /// of `credential`.
    pub async fn verify(&self, download_url: &str, credential: &AuthCredential) -> Result<VerifyPayload, ApiError> {
        tracing::debug!(download_url, %credential, "verifying download");

        let request = self
            .http
            .post(self.endpoint("download/verify"))
            .json(&json!({ "downloadUrl": download_url }));

        let response = send_authorized(request, credential).await?;
        let response = check_status(response).await?;
        parse_json(response).await
    }

    /// Fetch the status of an upstream download task.
    pub async fn task_status(&self, task_id: &str, credential: &AuthCredential) -> Result<TaskStatusPayload, ApiError> {
        tracing::debug!(task_id, %credential, "polling task status");

        let request = self
            .http
            .get(self.endpoint("download/tasks"))
            .query(&[("taskId", task_id)]);

        let response = send_authorized(request, credential).await?;
        let response = check_status(response).await?;
        parse_json(response).await
    }

    /// Start fetching a finished file.
    ///
    /// Returns as soon as the response headers arrive; the body is streamed.
    pub async fn retrieve(&self, url: &str) -> Result<RetrievedFile, ApiError> {
        let parsed = url::Url::parse(url).map_err(|e| ApiError::InvalidUrl(format!("{url}: {e}")))?;
        tracing::debug!(host = parsed.host_str().unwrap_or(""), "retrieving file");

        let response = self.download_http.get(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpError { status: status.as_u16(), message: None });
        }

        Ok(RetrievedFile::from_response(response))
    }
}

async fn send_authorized(request: RequestBuilder, credential: &AuthCredential) -> Result<Response, ApiError> {
    request
        .bearer_auth(credential.token())
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(ApiError::from)
}

/// Turn a non-success status into `ApiError::HttpError`, keeping the
/// upstream's `error` or `message` field as the message.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    tracing::debug!("upstream response status: {}", status);

    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .bytes()
        .await
        .ok()
        .and_then(|body| serde_json::from_slice::<Value>(&body).ok())
        .and_then(|body| extract_message(&body));

    Err(ApiError::HttpError { status: status.as_u16(), message })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
}

fn extract_message(body: &Value) -> Option<String> {
    let candidate = match body.get("error") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Object(obj)) => obj.get("message").and_then(Value::as_str),
        _ => None,
    }
    .or_else(|| body.get("message").and_then(Value::as_str));

    candidate.map(str::trim).filter(|m| !m.is_empty()).map(str::to_string)
}

/// Message to show for an upstream HTTP failure.
pub fn upstream_message(message: Option<&str>) -> String {
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(GENERIC_UPSTREAM_MESSAGE)
        .to_string()
}
