//! Stateless `/process` endpoint: one data URI in, validated rows out.
//!
//! Nothing is recorded in the registry; the caller waits for the extraction.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use promo_core::models::{ExtractedProduct, FileKind};
use promo_extract::data_uri;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::MessageResponse;
use crate::state::AppState;

const INVALID_BODY: &str = "Invalid request body.";
const PROCESSING_FAILED: &str = "Internal Server Error during file processing.";
const GET_HINT: &str = "This endpoint is for processing files via POST request.";

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessRequest {
    /// `"pdf"` or `"excel"`.
    #[serde(rename = "type", alias = "fileType")]
    pub file_type: String,
    /// Base64 data URI of the file.
    #[serde(alias = "fileDataUri")]
    pub file: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    pub products: Vec<ExtractedProduct>,
}

#[utoipa::path(
    post,
    path = "/process",
    tag = "process",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Extracted rows", body = ProcessResponse),
        (status = 400, description = "Malformed body or data URI", body = MessageResponse),
        (status = 500, description = "Extraction failed", body = MessageResponse)
    )
)]
pub async fn process_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(rejection.body_text()),
    };

    let kind = match request.file_type.parse::<FileKind>() {
        Ok(kind) => kind,
        Err(e) => return bad_request(e),
    };
    let decoded = match data_uri::decode(&request.file) {
        Ok(decoded) => decoded,
        Err(e) => return bad_request(e),
    };

    tracing::info!(
        kind = %kind,
        mime = %decoded.mime,
        size = decoded.bytes.len(),
        "Processing inline file"
    );

    match state
        .extraction
        .extract(decoded.bytes, &decoded.mime, kind)
        .await
    {
        Ok(products) => (StatusCode::OK, Json(ProcessResponse { products })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Inline file processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse::with_error(PROCESSING_FAILED, e)),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/process",
    tag = "process",
    responses(
        (status = 200, description = "Usage hint", body = MessageResponse)
    )
)]
pub async fn process_info() -> Json<MessageResponse> {
    Json(MessageResponse::new(GET_HINT))
}

fn bad_request(error: impl ToString) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(MessageResponse::with_error(INVALID_BODY, error)),
    )
        .into_response()
}
