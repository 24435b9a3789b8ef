//! assetgate HTTP server.
//!
//! Exposes the search, verification and download handlers over HTTP and
//! wires them to the upstream API client and the shared search cache.

pub mod routes;
pub mod state;

pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/search", get(routes::search::search).options(routes::search::preflight))
        .route("/download/verify", post(routes::verify::verify))
        .route("/download/file", post(routes::download::download))
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop expired search cache entries.
///
/// Runs until the process exits.
pub async fn sweep_cache(state: AppState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let purged = state.cache.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = state.cache.len(), "swept expired search cache entries");
        }
    }
}
