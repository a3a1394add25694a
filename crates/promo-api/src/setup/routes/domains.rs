//! File registry routes.

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn file_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/files", API_PREFIX),
            post(handlers::files::upload_files).get(handlers::files::list_files),
        )
        .route(
            &format!("{}/files/{{id}}", API_PREFIX),
            get(handlers::files::get_file).delete(handlers::files::delete_file),
        )
        .route(
            &format!("{}/files/{{id}}/retry", API_PREFIX),
            post(handlers::files::retry_file),
        )
        .route(
            &format!("{}/files/{{id}}/export.csv", API_PREFIX),
            get(handlers::files::export_file_csv),
        )
        .route(
            &format!("{}/summary", API_PREFIX),
            get(handlers::files::registry_summary),
        )
        .with_state(state)
}
