//! Download eligibility verification.

use super::{bearer_credential, json_body};
use crate::state::AppState;
use assetgate_client::{ApiClient, ApiError, VerificationResult, upstream_message};
use assetgate_core::{AuthCredential, Error};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

/// Body of `POST /download/verify`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Asks the upstream whether a URL can be downloaded by the caller.
#[derive(Debug)]
pub struct DownloadVerifier {
    client: ApiClient,
}

impl DownloadVerifier {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Verify `download_url` for the holder of `credential`.
    ///
    /// Input and credential are checked before any network call.
    pub async fn verify(
        &self, download_url: Option<&str>, credential: Option<&AuthCredential>,
    ) -> Result<VerificationResult, Error> {
        let download_url = download_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::InvalidInput("downloadUrl is required".into()))?;
        let credential = credential.ok_or_else(|| Error::AuthRequired("Authentication required".into()))?;

        let payload = self.client.verify(download_url, credential).await.map_err(|e| match e {
            ApiError::Timeout | ApiError::Connect(_) | ApiError::Network(_) => {
                tracing::warn!(error = %e, "verification service unreachable");
                Error::ServiceUnavailable("Unable to reach verification service".into())
            }
            ApiError::HttpError { status, message } => {
                Error::Upstream { status, message: upstream_message(message.as_deref()) }
            }
            ApiError::Parse(msg) | ApiError::InvalidUrl(msg) => Error::Internal(msg),
        })?;

        if !payload.is_success() {
            let message = payload.failure_message().unwrap_or("Verification failed").to_string();
            tracing::info!(download_url, %message, "download rejected by upstream");
            return Err(Error::VerificationFailed(message));
        }

        let result = VerificationResult::from(payload.data);
        tracing::debug!(
            download_url,
            supported = result.is_supported,
            allowed = result.is_allowed,
            affordable = result.can_afford,
            "download verified"
        );
        Ok(result)
    }
}

/// `POST /download/verify`
pub async fn verify(
    State(state): State<AppState>, headers: HeaderMap, body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let request = match json_body(body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };
    let credential = bearer_credential(&headers);

    match state.verifier.verify(request.download_url.as_deref(), credential.as_ref()).await {
        Ok(result) => Json(json!({ "success": true, "data": result })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetgate_client::ApiConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn verifier_for(base_url: &str) -> DownloadVerifier {
        DownloadVerifier::new(ApiClient::new(ApiConfig { base_url: base_url.to_string(), ..Default::default() }).unwrap())
    }

    fn credential() -> AuthCredential {
        AuthCredential::from_header("Bearer user-token").unwrap()
    }

    const URL: &str = "https://stock.example.com/image/12345";

    #[tokio::test]
    async fn test_missing_url() {
        let verifier = verifier_for("http://127.0.0.1:9");
        let err = verifier.verify(None, Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(0)
            .mount(&server)
            .await;

        let err = verifier_for(&server.uri()).verify(Some(URL), None).await.unwrap_err();
        assert!(matches!(err, Error::AuthRequired(_)));
    }

    #[tokio::test]
    async fn test_missing_subscription_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"is_supported": true, "is_allowed": true, "can_afford": true, "site": {"name": "Freepik"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = verifier_for(&server.uri()).verify(Some(URL), Some(&credential())).await.unwrap();
        assert!(result.is_supported);
        assert_eq!(result.site.name, "Freepik");
        assert_eq!(result.subscription.credits_remaining, 0);
        assert_eq!(result.subscription.credits_total, 0);
        assert_eq!(result.subscription.plan_name, "Free Plan");
        assert!(result.subscription.allowed_sites.is_empty());
    }

    #[tokio::test]
    async fn test_success_false_is_verification_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download/verify"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": false, "message": "Site not supported"})),
            )
            .mount(&server)
            .await;

        let err = verifier_for(&server.uri()).verify(Some(URL), Some(&credential())).await.unwrap_err();
        assert!(matches!(&err, Error::VerificationFailed(msg) if msg == "Site not supported"));
        assert_eq!(err.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_success_false_without_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let err = verifier_for(&server.uri()).verify(Some(URL), Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::VerificationFailed(msg) if msg == "Verification failed"));
    }

    #[tokio::test]
    async fn test_upstream_status_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({"error": "Insufficient credits"})))
            .mount(&server)
            .await;

        let err = verifier_for(&server.uri()).verify(Some(URL), Some(&credential())).await.unwrap_err();
        match err {
            Error::Upstream { status, message } => {
                assert_eq!(status, 402);
                assert_eq!(message, "Insufficient credits");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upstream_status_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let err = verifier_for(&server.uri()).verify(Some(URL), Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 500, message } if message == "Backend service error"));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let err = verifier_for("http://127.0.0.1:9").verify(Some(URL), Some(&credential())).await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }
}
