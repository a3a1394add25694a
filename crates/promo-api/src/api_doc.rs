//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use promo_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Promo Processor API",
        version = "0.1.0",
        description = "Upload supplier promotion files (PDF or Excel), track their extraction and download the normalized product rows. Registry endpoints are versioned under /api/v0/."
    ),
    paths(
        // Files
        handlers::files::upload_files,
        handlers::files::list_files,
        handlers::files::get_file,
        handlers::files::delete_file,
        handlers::files::retry_file,
        handlers::files::export_file_csv,
        handlers::files::registry_summary,
        // Inline processing
        handlers::process::process_file,
        handlers::process::process_info,
        // Reporting
        handlers::export::export_report,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::MessageResponse,
        handlers::files::UploadResponse,
        handlers::files::RejectedFile,
        handlers::process::ProcessRequest,
        handlers::process::ProcessResponse,
        handlers::export::UpstreamFailure,
        models::FileRecordView,
        models::FileDetailView,
        models::FileStatus,
        models::FileKind,
        models::FailureKind,
        models::RecordError,
        models::ExtractedProduct,
        models::ProcessingSummary,
        models::RegistrySummary,
    )),
    tags(
        (name = "files", description = "File registry and processing queue"),
        (name = "process", description = "Synchronous extraction of a single file"),
        (name = "export", description = "Reporting export proxy")
    )
)]
pub struct ApiDoc;
