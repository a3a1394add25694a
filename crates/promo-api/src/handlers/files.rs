//! File registry handlers: upload, list, detail, removal, retry and CSV export.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use promo_core::models::{ExtractedProduct, FileDetailView, FileRecordView, RegistrySummary};
use promo_core::AppError;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::constants::MAX_FILES_PER_UPLOAD;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_multipart_files;

#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedFile {
    pub name: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub accepted: Vec<FileRecordView>,
    pub rejected: Vec<RejectedFile>,
}

#[utoipa::path(
    post,
    path = "/api/v0/files",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Files queued for processing", body = UploadResponse),
        (status = 400, description = "No files or invalid form", body = ErrorResponse),
        (status = 409, description = "Every file was a duplicate", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported file type", body = ErrorResponse)
    )
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), HttpAppError> {
    let uploads = extract_multipart_files(multipart, MAX_FILES_PER_UPLOAD).await?;
    let mut outcome = state.queue.submit_batch(uploads);

    if outcome.accepted.is_empty() && !outcome.rejected.is_empty() {
        let first = outcome.rejected.swap_remove(0);
        return Err(first.into());
    }

    tracing::info!(
        accepted = outcome.accepted.len(),
        rejected = outcome.rejected.len(),
        "Upload batch processed"
    );

    let rejected = outcome
        .rejected
        .iter()
        .map(|err| RejectedFile {
            name: err.file_name().to_string(),
            code: err.code().to_string(),
            message: err.to_string(),
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            accepted: outcome.accepted,
            rejected,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v0/files",
    tag = "files",
    responses(
        (status = 200, description = "Tracked files, newest first", body = Vec<FileRecordView>)
    )
)]
pub async fn list_files(State(state): State<Arc<AppState>>) -> Json<Vec<FileRecordView>> {
    Json(state.queue.list())
}

#[utoipa::path(
    get,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File with its extracted rows", body = FileDetailView),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileDetailView>, HttpAppError> {
    state
        .queue
        .get(id)
        .map(Json)
        .ok_or_else(|| file_not_found(id))
}

#[utoipa::path(
    delete,
    path = "/api/v0/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 204, description = "File removed"),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpAppError> {
    if state.queue.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(file_not_found(id))
    }
}

#[utoipa::path(
    post,
    path = "/api/v0/files/{id}/retry",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 202, description = "File queued again", body = FileRecordView),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "File is not in error or retry limit reached", body = ErrorResponse)
    )
)]
pub async fn retry_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<FileRecordView>), HttpAppError> {
    let view = state.queue.retry(id)?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v0/files/{id}/export.csv",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "Extracted rows as CSV", body = String, content_type = "text/csv"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 409, description = "File has not finished processing", body = ErrorResponse)
    )
)]
pub async fn export_file_csv(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, HttpAppError> {
    let detail = state.queue.get(id).ok_or_else(|| file_not_found(id))?;
    let Some(products) = detail.products else {
        return Err(AppError::Conflict(format!(
            "File {} is {}, rows are only available once processing is done",
            id, detail.file.status
        ))
        .into());
    };

    let body = products_to_csv(&products)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        csv_file_name(&detail.file.name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/v0/summary",
    tag = "files",
    responses(
        (status = 200, description = "File counts per status", body = RegistrySummary)
    )
)]
pub async fn registry_summary(State(state): State<Arc<AppState>>) -> Json<RegistrySummary> {
    Json(state.queue.summary())
}

fn file_not_found(id: Uuid) -> HttpAppError {
    AppError::NotFound(format!("File {} not found", id)).into()
}

fn products_to_csv(products: &[ExtractedProduct]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let to_internal = |e: csv::Error| AppError::Internal(format!("Failed to write CSV: {}", e));

    writer
        .write_record(ExtractedProduct::COLUMNS)
        .map_err(to_internal)?;
    for product in products {
        writer.write_record(product.to_row()).map_err(to_internal)?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))
}

/// `lista.xlsx` becomes `lista.csv`; quotes are dropped to keep the header valid.
fn csv_file_name(original: &str) -> String {
    let stem = original
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(original);
    let stem: String = stem.chars().filter(|c| *c != '"' && !c.is_control()).collect();
    format!("{}.csv", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> ExtractedProduct {
        ExtractedProduct {
            provider_code: "PRV-1".to_string(),
            product_code: "7790001".to_string(),
            description: "Jabon, 90g".to_string(),
            brand: "Dove".to_string(),
            category: "Higiene".to_string(),
            discount_description: "2x1".to_string(),
            minimum_purchase_quantity: Some(2),
            offer_conditions: None,
        }
    }

    #[test]
    fn test_csv_has_header_and_quoted_cells() {
        let csv = String::from_utf8(products_to_csv(&[product()]).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("provider_code,product_code,description,brand,category,discount_description,minimum_purchase_quantity,offer_conditions")
        );
        assert_eq!(
            lines.next(),
            Some("PRV-1,7790001,\"Jabon, 90g\",Dove,Higiene,2x1,2,")
        );
    }

    #[test]
    fn test_csv_file_name_replaces_extension() {
        assert_eq!(csv_file_name("lista.xlsx"), "lista.csv");
        assert_eq!(csv_file_name("sin_extension"), "sin_extension.csv");
        assert_eq!(csv_file_name("\"raro\".pdf"), "raro.csv");
    }
}
