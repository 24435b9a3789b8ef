//! HTTP route handlers.
//!
//! Each handler module owns its service object (the part that talks to the
//! upstream) and the thin axum function that adapts it to HTTP.

pub mod download;
pub mod search;
pub mod verify;

use assetgate_core::{AuthCredential, Error};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, header};
use serde_json::{Value, json};

/// Bearer credential from the `Authorization` header, if there is a usable one.
pub fn bearer_credential(headers: &HeaderMap) -> Option<AuthCredential> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(AuthCredential::from_header)
}

/// Unwrap a JSON body, reporting any rejection as invalid input.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| Error::InvalidInput(rejection.body_text()))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
