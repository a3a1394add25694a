//! `/export` proxy handler.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use super::MessageResponse;
use crate::services::{ExportBody, ExportError};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    /// First day of the range, passed through unchanged.
    pub start_date: Option<String>,
    /// Last day of the range, passed through unchanged.
    pub end_date: Option<String>,
}

/// 502 body describing a failed upstream call.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamFailure {
    pub message: String,
    pub status: u16,
    pub status_text: String,
    pub trace: Option<String>,
    #[schema(value_type = Object)]
    pub upstream_body: serde_json::Value,
}

#[utoipa::path(
    get,
    path = "/export",
    tag = "export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Upstream export, JSON or text"),
        (status = 400, description = "Missing date range", body = MessageResponse),
        (status = 500, description = "Misconfiguration, timeout or unexpected failure", body = MessageResponse),
        (status = 502, description = "Upstream returned an error", body = UpstreamFailure)
    )
)]
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let result = state
        .export
        .fetch(query.start_date.as_deref(), query.end_date.as_deref())
        .await;

    match result {
        Ok(ExportBody::Json(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(ExportBody::Text { content_type, body }) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => export_error_response(e),
    }
}

fn export_error_response(err: ExportError) -> Response {
    let message = err.to_string();
    match err {
        ExportError::MissingDates => {
            (StatusCode::BAD_REQUEST, Json(MessageResponse::new(message))).into_response()
        }
        ExportError::MissingPrivateKey | ExportError::MissingUpstreamUrl => {
            tracing::error!(error = %message, "Export proxy is not configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::new(message)),
            )
                .into_response()
        }
        ExportError::Upstream {
            status,
            status_text,
            trace,
            body,
        } => (
            StatusCode::BAD_GATEWAY,
            Json(UpstreamFailure {
                message,
                status,
                status_text,
                trace,
                upstream_body: body,
            }),
        )
            .into_response(),
        ExportError::Timeout(detail) | ExportError::Unexpected(detail) => {
            tracing::error!(error = %detail, "Export proxy request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::with_error(message, detail)),
            )
                .into_response()
        }
    }
}
