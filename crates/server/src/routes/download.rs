//! Two-phase file download: poll the upstream task, then relay the file.
//!
//! A task that is still running is reported as not ready (202) so the caller
//! can retry; nothing blocks waiting for it. Once the task is complete the
//! file is fetched from its resolved URL and streamed through unbuffered.

use super::{bearer_credential, json_body};
use crate::state::AppState;
use assetgate_client::{
    ApiClient, ApiError, FileStream, TaskStatus, content_disposition_header, resolve_filename, upstream_message,
};
use assetgate_core::{AuthCredential, Error};
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Body of `POST /download/file`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
}

/// A finished file ready to be relayed.
pub struct FileResponse {
    pub filename: String,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub body: FileStream,
}

impl std::fmt::Debug for FileResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileResponse")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Ready(FileResponse),
    /// The task exists but has not produced a file yet.
    NotReady { task_id: String, status: TaskStatus, percentage: Option<f64> },
}

/// Hides the asynchronous upstream job behind a single request.
#[derive(Debug)]
pub struct DownloadStreamer {
    client: ApiClient,
}

impl DownloadStreamer {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Poll `task_id` and, if it is complete, start streaming its file.
    ///
    /// `download_url` is the URL the client originally asked for; it is only
    /// used to derive a filename.
    pub async fn download(
        &self, task_id: Option<&str>, download_url: Option<&str>, credential: Option<&AuthCredential>,
    ) -> Result<DownloadOutcome, Error> {
        let task_id = task_id
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidInput("taskId is required".into()))?;
        let credential = credential.ok_or_else(|| Error::AuthRequired("Authentication required".into()))?;

        let payload = self.client.task_status(task_id, credential).await.map_err(|e| match e {
            ApiError::HttpError { status, message } => {
                Error::Upstream { status, message: upstream_message(message.as_deref()) }
            }
            ApiError::Timeout | ApiError::Connect(_) | ApiError::Network(_) => {
                tracing::warn!(task_id, error = %e, "task status service unreachable");
                Error::ServiceUnavailable("Unable to reach download service".into())
            }
            ApiError::Parse(msg) | ApiError::InvalidUrl(msg) => Error::Internal(msg),
        })?;

        let task = payload
            .find(task_id)
            .ok_or_else(|| match payload.message() {
                Some(message) => Error::NotFound(message.to_string()),
                None => Error::NotFound(format!("Task {task_id} not found")),
            })?;

        let status = task.status();
        tracing::debug!(task_id, %status, "task status");

        if status == TaskStatus::Failed {
            return Err(Error::TaskFailed(format!("Download task {task_id} failed")));
        }

        let file_url = match (status, task.download_url()) {
            (TaskStatus::Completed, Some(url)) => url,
            (status, _) => {
                return Ok(DownloadOutcome::NotReady {
                    task_id: task_id.to_string(),
                    status,
                    percentage: task.percentage(),
                });
            }
        };

        let file = self.client.retrieve(file_url).await.map_err(|e| {
            tracing::warn!(task_id, error = %e, "file retrieval failed");
            Error::Retrieval(format!("Failed to retrieve file: {e}"))
        })?;

        let filename = resolve_filename(task.filename(), file.content_disposition.as_deref(), download_url);
        tracing::info!(task_id, %filename, content_length = ?file.content_length, "streaming file");

        Ok(DownloadOutcome::Ready(FileResponse {
            filename,
            content_type: file.content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            content_length: file.content_length,
            body: file.body,
        }))
    }
}

impl IntoResponse for FileResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(&self.content_type).unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE)),
        );
        if let Some(len) = self.content_length {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&content_disposition_header(&self.filename))
                .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"download\"")),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store, no-cache, must-revalidate"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        (StatusCode::OK, headers, Body::from_stream(self.body)).into_response()
    }
}

impl IntoResponse for DownloadOutcome {
    fn into_response(self) -> Response {
        match self {
            DownloadOutcome::Ready(file) => file.into_response(),
            DownloadOutcome::NotReady { task_id, status, percentage } => (
                StatusCode::ACCEPTED,
                Json(json!({
                    "success": false,
                    "taskId": task_id,
                    "status": status.to_string(),
                    "percentage": percentage,
                    "message": "File is not ready yet, please try again shortly",
                })),
            )
                .into_response(),
        }
    }
}

/// `POST /download/file`
pub async fn download(
    State(state): State<AppState>, headers: HeaderMap, body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };
    let credential = bearer_credential(&headers);

    match state
        .streamer
        .download(request.task_id.as_deref(), request.download_url.as_deref(), credential.as_ref())
        .await
    {
        Ok(outcome) => outcome.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgate_client::ApiConfig;
    use futures_util::TryStreamExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn streamer_for(server: &MockServer) -> DownloadStreamer {
        DownloadStreamer::new(ApiClient::new(ApiConfig { base_url: server.uri(), ..Default::default() }).unwrap())
    }

    fn credential() -> AuthCredential {
        AuthCredential::from_header("Bearer user-token").unwrap()
    }

    async fn mount_task(server: &MockServer, task: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/download/tasks"))
            .and(query_param("taskId", "t-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": [task]})))
            .mount(server)
            .await;
    }

    fn completed_task(server: &MockServer, filename: &str) -> serde_json::Value {
        json!({
            "id": "t-1",
            "progress": {"status": "completed"},
            "download": {"downloadUrl": format!("{}/files/abc", server.uri()), "filename": filename}
        })
    }

    async fn collect(file: FileResponse) -> Vec<u8> {
        let chunks: Vec<axum::body::Bytes> = file.body.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_missing_task_id() {
        let server = MockServer::start().await;
        let err = streamer_for(&server).download(None, None, Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let err = streamer_for(&server).download(Some("t-1"), None, None).await.unwrap_err();
        assert!(matches!(err, Error::AuthRequired(_)));
    }

    #[tokio::test]
    async fn test_processing_task_is_not_ready() {
        let server = MockServer::start().await;
        mount_task(&server, json!({"id": "t-1", "progress": {"status": "processing", "percentage": 40}})).await;
        Mock::given(method("GET"))
            .and(path("/files/abc"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = streamer_for(&server).download(Some("t-1"), None, Some(&credential())).await.unwrap();
        assert!(matches!(
            outcome,
            DownloadOutcome::NotReady { status: TaskStatus::Processing, percentage: Some(p), .. } if p == 40.0
        ));

        let response = outcome.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["taskId"], "t-1");
        assert_eq!(body["status"], "processing");
        assert_eq!(body["percentage"], 40.0);
    }

    #[tokio::test]
    async fn test_completed_without_url_is_not_ready() {
        let server = MockServer::start().await;
        mount_task(&server, json!({"id": "t-1", "progress": {"status": "completed"}, "download": {}})).await;

        let outcome = streamer_for(&server).download(Some("t-1"), None, Some(&credential())).await.unwrap();
        assert!(matches!(outcome, DownloadOutcome::NotReady { status: TaskStatus::Completed, .. }));
    }

    #[tokio::test]
    async fn test_failed_task() {
        let server = MockServer::start().await;
        mount_task(&server, json!({"id": "t-1", "progress": {"status": "failed"}})).await;

        let err = streamer_for(&server).download(Some("t-1"), None, Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::TaskFailed(_)));
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
            .mount(&server)
            .await;

        let err = streamer_for(&server).download(Some("t-1"), None, Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(msg) if msg == "Task t-1 not found"));
    }

    #[tokio::test]
    async fn test_unknown_task_keeps_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/tasks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Task expired"})),
            )
            .mount(&server)
            .await;

        let err = streamer_for(&server).download(Some("t-1"), None, Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(msg) if msg == "Task expired"));
    }

    #[tokio::test]
    async fn test_status_endpoint_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/download/tasks"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden"})))
            .mount(&server)
            .await;

        let err = streamer_for(&server).download(Some("t-1"), None, Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 403, message } if message == "Forbidden"));
    }

    #[tokio::test]
    async fn test_completed_task_streams_file() {
        let server = MockServer::start().await;
        mount_task(&server, completed_task(&server, "cat.png")).await;
        Mock::given(method("GET"))
            .and(path("/files/abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = streamer_for(&server)
            .download(Some("t-1"), Some("https://x/y/z.jpg"), Some(&credential()))
            .await
            .unwrap();
        let DownloadOutcome::Ready(file) = outcome else { panic!("expected a file") };

        assert_eq!(file.filename, "cat.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.content_length, Some(4));
        assert_eq!(collect(file).await, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_filename_from_client_url() {
        let server = MockServer::start().await;
        mount_task(&server, completed_task(&server, "download")).await;
        Mock::given(method("GET"))
            .and(path("/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;

        let outcome = streamer_for(&server)
            .download(Some("t-1"), Some("https://x/y/photo.jpg?sig=1"), Some(&credential()))
            .await
            .unwrap();
        let DownloadOutcome::Ready(file) = outcome else { panic!("expected a file") };

        assert_eq!(file.filename, "photo.jpg");
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_filename_from_content_disposition() {
        let server = MockServer::start().await;
        mount_task(&server, completed_task(&server, "")).await;
        Mock::given(method("GET"))
            .and(path("/files/abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"vector.eps\"")
                    .set_body_bytes(b"eps".to_vec()),
            )
            .mount(&server)
            .await;

        let outcome = streamer_for(&server)
            .download(Some("t-1"), Some("https://x/y/z.jpg"), Some(&credential()))
            .await
            .unwrap();
        let DownloadOutcome::Ready(file) = outcome else { panic!("expected a file") };
        assert_eq!(file.filename, "vector.eps");
    }

    #[tokio::test]
    async fn test_retrieval_failure() {
        let server = MockServer::start().await;
        mount_task(&server, completed_task(&server, "cat.png")).await;
        Mock::given(method("GET"))
            .and(path("/files/abc"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = streamer_for(&server).download(Some("t-1"), None, Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_file_response_headers() {
        let body: FileStream = Box::pin(futures_util::stream::iter(vec![Ok::<_, ApiError>(axum::body::Bytes::from_static(b"hi"))]));
        let response = FileResponse {
            filename: "café.txt".into(),
            content_type: "text/plain".into(),
            content_length: Some(2),
            body,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::CONTENT_LENGTH], "2");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"caf_.txt\"; filename*=UTF-8''caf%C3%A9.txt"
        );
        assert_eq!(headers[header::CACHE_CONTROL], "no-store, no-cache, must-revalidate");
    }
}
