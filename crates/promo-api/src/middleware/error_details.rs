use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::RedactedErrorBody;
use crate::state::AppState;

/// Replaces error bodies with their detail-free rendering in production.
pub async fn error_details_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(RedactedErrorBody(body)) = response.extensions_mut().remove::<RedactedErrorBody>()
    else {
        return response;
    };
    if state.is_production {
        *response.body_mut() = Json(body).into_response().into_body();
    }
    response
}
