//! Multipart helpers for the upload handler

use axum::extract::Multipart;
use promo_core::validation::content_type_for_filename;
use promo_core::AppError;
use promo_worker::Upload;

const FILE_FIELD: &str = "file";
const OCTET_STREAM: &str = "application/octet-stream";

/// Collect every `file` field of a multipart form.
///
/// Browsers send `application/octet-stream` for unknown types, in which case
/// the media type is inferred from the file extension.
pub async fn extract_multipart_files(
    mut multipart: Multipart,
    max_files: usize,
) -> Result<Vec<Upload>, AppError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if uploads.len() == max_files {
            return Err(AppError::InvalidInput(format!(
                "Too many files; at most {} files can be uploaded at once",
                max_files
            )));
        }

        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        let declared = field.content_type().map(str::to_string);

        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;

        uploads.push(Upload {
            content_type: resolve_content_type(declared.as_deref(), &name),
            name,
            content,
        });
    }

    if uploads.is_empty() {
        return Err(AppError::InvalidInput("No file provided".to_string()));
    }

    Ok(uploads)
}

fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    match declared {
        Some(ct) if !ct.trim().is_empty() && !ct.eq_ignore_ascii_case(OCTET_STREAM) => {
            ct.to_string()
        }
        _ => content_type_for_filename(filename)
            .unwrap_or(OCTET_STREAM)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_wins() {
        assert_eq!(
            resolve_content_type(Some("application/pdf"), "lista.xlsx"),
            "application/pdf"
        );
    }

    #[test]
    fn test_octet_stream_falls_back_to_the_extension() {
        assert_eq!(
            resolve_content_type(Some(OCTET_STREAM), "lista.PDF"),
            "application/pdf"
        );
        assert_eq!(resolve_content_type(None, "notas.txt"), OCTET_STREAM);
    }
}
