//! Health check handlers and response types.

use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use promo_core::models::RegistrySummary;
use std::sync::Arc;

#[derive(serde::Serialize)]
pub(super) struct HealthCheckResponse {
    pub status: String,
    pub queue: String,
    pub files: RegistrySummary,
}

pub(super) fn health_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get({
                let state = state.clone();
                move || async { health_check(state).await }
            }),
        )
        .route(
            "/health/live",
            get({
                let state = state.clone();
                move || async { liveness_check(state).await }
            }),
        )
        .with_state(state)
}

/// Liveness check: the process is running.
pub async fn liveness_check(_state: Arc<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Healthy while the queue consumer is running.
pub async fn health_check(state: Arc<AppState>) -> impl IntoResponse {
    let running = state.queue.is_running();
    let (status, code, queue) = if running {
        ("healthy", StatusCode::OK, "running")
    } else {
        tracing::error!("Health check failed: processing queue is stopped");
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, "stopped")
    };

    (
        code,
        Json(HealthCheckResponse {
            status: status.to_string(),
            queue: queue.to_string(),
            files: state.queue.summary(),
        }),
    )
}
