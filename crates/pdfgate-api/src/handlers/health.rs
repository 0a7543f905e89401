//! Health check handler.

use crate::constants::HEALTH_CHECK_TIMEOUT_SECS;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub backend: String,
    pub store: String,
    pub queue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<usize>,
}

/// Store and queue liveness. 503 when either dependency fails.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

    let store = state.store().clone();
    let store_status = run_check(timeout, async move { store.ping().await }, "unhealthy").await;

    let queue = state.queue.clone();
    let queue_status = run_check(timeout, async move { queue.ping().await }, "unhealthy").await;

    let healthy = store_status == "healthy" && queue_status == "healthy";
    let queue_depth = if healthy {
        state.queue.depth().await.ok()
    } else {
        None
    };

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        backend: state.config.storage_backend.to_string(),
        store: store_status,
        queue: queue_status,
        queue_depth,
    };

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        tracing::warn!(store = %response.store, queue = %response.queue, "Health check failed");
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
