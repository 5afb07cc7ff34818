//! Scrape endpoint
//!
//! Serves the metrics model in Prometheus text format. The server only
//! reads published metric values; it never touches the node registry.

use crate::config::ServerConfig;
use crate::telemetry::exposition::{self, CONTENT_TYPE};
use crate::telemetry::MetricsModel;
use crate::{Error, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
struct ServerState {
    metrics: Arc<MetricsModel>,
    prefix: Arc<str>,
}

/// Builds the HTTP routes for `config`.
pub fn router(metrics: Arc<MetricsModel>, config: &ServerConfig) -> Router {
    let state = ServerState {
        metrics,
        prefix: Arc::from(config.prefix.as_str()),
    };

    Router::new()
        .route(&config.path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Binds `config.listen` and serves until the task is dropped.
pub async fn serve(metrics: Arc<MetricsModel>, config: &ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(&config.listen)
        .await
        .map_err(|e| Error::Server(format!("cannot bind {}: {}", config.listen, e)))?;
    serve_on(listener, metrics, config).await
}

/// Serves on an already bound listener.
pub async fn serve_on(
    listener: TcpListener,
    metrics: Arc<MetricsModel>,
    config: &ServerConfig,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Serving metrics on http://{}{}", addr, config.path);

    axum::serve(listener, router(metrics, config))
        .await
        .map_err(|e| Error::Server(e.to_string()))
}

async fn metrics_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let body = exposition::render(&state.metrics, &state.prefix);
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}

async fn health_handler() -> &'static str {
    "ok"
}
