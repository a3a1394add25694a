//! Route configuration and setup.
//!
//! Registry routes live in [domains](domains); health checks in [health](health).

mod domains;
mod health;

use crate::constants::{HTTP_CONCURRENCY_LIMIT, MAX_FILES_PER_UPLOAD, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use promo_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let body_limit = request_body_limit(config);
    tracing::info!(body_limit_bytes = body_limit, "Request body limit layer enabled");

    let app = Router::new()
        .merge(domains::file_routes(state.clone()))
        .merge(process_routes(state.clone()))
        .merge(health::health_routes(state.clone()))
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::error_details_middleware,
        ))
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn process_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/process",
            get(handlers::process::process_info).post(handlers::process::process_file),
        )
        .route("/export", get(handlers::export::export_report))
        .with_state(state)
}

/// Room for a full batch of maximum-size files. A data URI sent to
/// `/process` is a third larger than the file, which also fits.
fn request_body_limit(config: &Config) -> usize {
    let max_file = usize::try_from(config.max_file_size_bytes()).unwrap_or(usize::MAX);
    max_file
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD_BYTES)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
