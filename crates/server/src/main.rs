//! assetgate server entry point.
//!
//! Loads configuration, builds the handler services once, and serves them
//! over HTTP until interrupted.

use anyhow::{Context, Result};
use assetgate_core::{AppConfig, SystemClock};
use assetgate_server::{AppState, build_router, sweep_cache};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let state = AppState::from_config(&config, Arc::new(SystemClock)).context("failed to build upstream client")?;

    if let Some(every) = config.cache_sweep_interval() {
        tokio::spawn(sweep_cache(state.clone(), every));
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %config.bind_addr,
        upstream = %config.api_base_url,
        cache_ttl_secs = state.cache.ttl().num_seconds(),
        "Starting assetgate server"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("assetgate server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
