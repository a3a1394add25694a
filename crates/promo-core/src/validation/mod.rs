//! Intake validation
//!
//! Decides whether an uploaded file may enter the registry: the declared media
//! type must be PDF or a spreadsheet, the payload must be non-empty and within
//! the configured size, and no tracked file may share its name and byte size.

use std::path::Path;

use crate::error::AppError;
use crate::models::FileKind;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const ACCEPTED_CONTENT_TYPES: [&str; 3] =
    [PDF_CONTENT_TYPE, XLS_CONTENT_TYPE, XLSX_CONTENT_TYPE];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("File \"{name}\" is not supported ({content_type}). Only Excel and PDF files are allowed.")]
    InvalidFileType { name: String, content_type: String },

    #[error("File \"{name}\" has already been uploaded.")]
    DuplicateFile { name: String },

    #[error("File \"{name}\" is empty.")]
    EmptyFile { name: String },

    #[error("File \"{name}\" is {size} bytes, the limit is {max} bytes.")]
    PayloadTooLarge { name: String, size: u64, max: u64 },
}

impl IntakeError {
    pub fn code(&self) -> &'static str {
        match self {
            IntakeError::InvalidFileType { .. } | IntakeError::EmptyFile { .. } => {
                "INVALID_FILE_TYPE"
            }
            IntakeError::DuplicateFile { .. } => "DUPLICATE_FILE",
            IntakeError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            IntakeError::InvalidFileType { name, .. }
            | IntakeError::DuplicateFile { name }
            | IntakeError::EmptyFile { name }
            | IntakeError::PayloadTooLarge { name, .. } => name,
        }
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        let message = err.to_string();
        match err {
            IntakeError::InvalidFileType { .. } | IntakeError::EmptyFile { .. } => {
                AppError::InvalidFileType(message)
            }
            IntakeError::DuplicateFile { .. } => AppError::DuplicateFile(message),
            IntakeError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(message),
        }
    }
}

/// Lowercases a media type and strips parameters such as `; charset=...`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Maps an accepted media type to its [`FileKind`].
pub fn kind_for_content_type(content_type: &str) -> Option<FileKind> {
    match normalize_content_type(content_type).as_str() {
        PDF_CONTENT_TYPE => Some(FileKind::Pdf),
        XLS_CONTENT_TYPE | XLSX_CONTENT_TYPE => Some(FileKind::Spreadsheet),
        _ => None,
    }
}

/// Media type implied by a file name, for clients that send no usable
/// `Content-Type` (e.g. `application/octet-stream`).
pub fn content_type_for_filename(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    match extension.as_str() {
        "pdf" => Some(PDF_CONTENT_TYPE),
        "xls" => Some(XLS_CONTENT_TYPE),
        "xlsx" => Some(XLSX_CONTENT_TYPE),
        _ => None,
    }
}

/// Validates a candidate upload against the files already tracked.
///
/// `existing` yields `(name, size_bytes)` for every tracked record.
pub fn validate_intake<'a>(
    name: &str,
    content_type: &str,
    size_bytes: u64,
    max_size_bytes: u64,
    mut existing: impl Iterator<Item = (&'a str, u64)>,
) -> Result<FileKind, IntakeError> {
    let kind = kind_for_content_type(content_type).ok_or_else(|| IntakeError::InvalidFileType {
        name: name.to_string(),
        content_type: content_type.to_string(),
    })?;

    if size_bytes == 0 {
        return Err(IntakeError::EmptyFile {
            name: name.to_string(),
        });
    }

    if size_bytes > max_size_bytes {
        return Err(IntakeError::PayloadTooLarge {
            name: name.to_string(),
            size: size_bytes,
            max: max_size_bytes,
        });
    }

    if existing.any(|(n, s)| n == name && s == size_bytes) {
        return Err(IntakeError::DuplicateFile {
            name: name.to_string(),
        });
    }

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 1024;

    #[test]
    fn test_accepts_allowed_types() {
        let none = std::iter::empty();
        assert_eq!(
            validate_intake("a.pdf", "application/pdf", 10, MAX, none).unwrap(),
            FileKind::Pdf
        );
        assert_eq!(
            validate_intake("a.xls", "Application/VND.ms-excel", 10, MAX, std::iter::empty())
                .unwrap(),
            FileKind::Spreadsheet
        );
        assert_eq!(
            validate_intake(
                "a.xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet; charset=binary",
                10,
                MAX,
                std::iter::empty()
            )
            .unwrap(),
            FileKind::Spreadsheet
        );
    }

    #[test]
    fn test_rejects_other_types() {
        let err = validate_intake("notes.docx", "application/msword", 10, MAX, std::iter::empty())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_FILE_TYPE");
        assert_eq!(err.file_name(), "notes.docx");
    }

    #[test]
    fn test_rejects_same_name_and_size() {
        let existing = vec![("promo.xlsx".to_string(), 12_288u64)];
        let err = validate_intake(
            "promo.xlsx",
            XLSX_CONTENT_TYPE,
            12_288,
            100_000,
            existing.iter().map(|(n, s)| (n.as_str(), *s)),
        )
        .unwrap_err();
        assert_eq!(
            err,
            IntakeError::DuplicateFile {
                name: "promo.xlsx".to_string()
            }
        );
    }

    #[test]
    fn test_same_name_different_size_is_not_a_duplicate() {
        let existing = vec![("promo.xlsx".to_string(), 12_288u64)];
        assert!(validate_intake(
            "promo.xlsx",
            XLSX_CONTENT_TYPE,
            12_289,
            100_000,
            existing.iter().map(|(n, s)| (n.as_str(), *s)),
        )
        .is_ok());
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert!(matches!(
            validate_intake("a.pdf", PDF_CONTENT_TYPE, 0, MAX, std::iter::empty()),
            Err(IntakeError::EmptyFile { .. })
        ));
        assert!(matches!(
            validate_intake("a.pdf", PDF_CONTENT_TYPE, MAX + 1, MAX, std::iter::empty()),
            Err(IntakeError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_infers_content_type_from_extension() {
        assert_eq!(content_type_for_filename("PROMO.XLSX"), Some(XLSX_CONTENT_TYPE));
        assert_eq!(content_type_for_filename("lista.pdf"), Some(PDF_CONTENT_TYPE));
        assert_eq!(content_type_for_filename("readme"), None);
    }

    #[test]
    fn test_intake_errors_map_to_app_errors() {
        let app: AppError = IntakeError::DuplicateFile {
            name: "a.pdf".to_string(),
        }
        .into();
        assert!(matches!(app, AppError::DuplicateFile(_)));
    }
}
