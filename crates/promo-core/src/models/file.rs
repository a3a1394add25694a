use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::product::ExtractedProduct;
use super::summary::ProcessingSummary;

/// Lifecycle status of an uploaded file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Done | FileStatus::Error)
    }
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStatus::Pending => write!(f, "pending"),
            FileStatus::Processing => write!(f, "processing"),
            FileStatus::Done => write!(f, "done"),
            FileStatus::Error => write!(f, "error"),
        }
    }
}

/// Kind of document accepted at intake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Pdf,
    Spreadsheet,
}

impl FileKind {
    /// Discriminator sent to the extraction call (`"pdf"` or `"excel"`).
    pub fn request_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Spreadsheet => "excel",
        }
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.request_type())
    }
}

impl FromStr for FileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "excel" | "spreadsheet" => Ok(FileKind::Spreadsheet),
            _ => Err(anyhow::anyhow!("Invalid file type: {}", s)),
        }
    }
}

/// Classification of a processing failure, as shown to the user next to a failed file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedWorkbook,
    UpstreamUnavailable,
    UpstreamMalformedResponse,
}

impl FailureKind {
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::MalformedWorkbook => "MALFORMED_WORKBOOK",
            FailureKind::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            FailureKind::UpstreamMalformedResponse => "UPSTREAM_MALFORMED_RESPONSE",
        }
    }
}

/// Failure attached to a record in `Error` status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct RecordError {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition from {from} to {to}")]
pub struct TransitionError {
    pub from: FileStatus,
    pub to: FileStatus,
}

/// A tracked upload and its processing state.
///
/// `result` is `Some` exactly when the status is `Done`, and `error` is `Some`
/// exactly when the status is `Error`. The transition methods are the only
/// way to change the status.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub kind: FileKind,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    status: FileStatus,
    result: Option<Vec<ExtractedProduct>>,
    error: Option<RecordError>,
    attempts: u32,
    raw_content: Option<Bytes>,
}

impl FileRecord {
    pub fn new(name: String, content_type: String, kind: FileKind, content: Bytes) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            size_bytes: content.len() as u64,
            kind,
            content_type,
            uploaded_at: Utc::now(),
            status: FileStatus::Pending,
            result: None,
            error: None,
            attempts: 0,
            raw_content: Some(content),
        }
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn result(&self) -> Option<&[ExtractedProduct]> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&RecordError> {
        self.error.as_ref()
    }

    /// Number of times this record has entered `Processing`.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn raw_content(&self) -> Option<&Bytes> {
        self.raw_content.as_ref()
    }

    /// `Pending -> Processing`. Returns the attempt number that was started.
    pub fn begin_processing(&mut self) -> Result<u32, TransitionError> {
        self.expect_status(FileStatus::Pending, FileStatus::Processing)?;
        self.status = FileStatus::Processing;
        self.attempts += 1;
        Ok(self.attempts)
    }

    /// `Processing -> Done`. The raw payload is released once a result is attached.
    pub fn complete(&mut self, products: Vec<ExtractedProduct>) -> Result<(), TransitionError> {
        self.expect_status(FileStatus::Processing, FileStatus::Done)?;
        self.status = FileStatus::Done;
        self.result = Some(products);
        self.error = None;
        self.raw_content = None;
        Ok(())
    }

    /// `Processing -> Error`. The payload is kept so the file can be retried.
    pub fn fail(&mut self, error: RecordError) -> Result<(), TransitionError> {
        self.expect_status(FileStatus::Processing, FileStatus::Error)?;
        self.status = FileStatus::Error;
        self.result = None;
        self.error = Some(error);
        Ok(())
    }

    /// `Error -> Pending`, the only backward transition.
    pub fn reset_for_retry(&mut self) -> Result<(), TransitionError> {
        self.expect_status(FileStatus::Error, FileStatus::Pending)?;
        self.status = FileStatus::Pending;
        self.error = None;
        Ok(())
    }

    fn expect_status(&self, from: FileStatus, to: FileStatus) -> Result<(), TransitionError> {
        if self.status == from {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status,
                to,
            })
        }
    }
}

/// Serializable view of a [`FileRecord`] without the raw payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileRecordView {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub kind: FileKind,
    pub uploaded_at: DateTime<Utc>,
    pub status: FileStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RecordError>,
    /// Number of extracted rows, present once processing finished successfully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<usize>,
}

impl From<&FileRecord> for FileRecordView {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            size_bytes: record.size_bytes,
            kind: record.kind,
            uploaded_at: record.uploaded_at,
            status: record.status,
            attempts: record.attempts,
            error: record.error.clone(),
            product_count: record.result.as_ref().map(Vec::len),
        }
    }
}

/// A record together with its extracted rows, for the detail view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileDetailView {
    #[serde(flatten)]
    pub file: FileRecordView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<ExtractedProduct>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ProcessingSummary>,
}

impl From<&FileRecord> for FileDetailView {
    fn from(record: &FileRecord) -> Self {
        Self {
            file: FileRecordView::from(record),
            products: record.result.clone(),
            summary: record.result().map(ProcessingSummary::from_products),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FileRecord {
        FileRecord::new(
            "promo.pdf".to_string(),
            "application/pdf".to_string(),
            FileKind::Pdf,
            Bytes::from_static(b"%PDF-1.4"),
        )
    }

    fn failure() -> RecordError {
        RecordError {
            kind: FailureKind::UpstreamUnavailable,
            message: "timed out".to_string(),
        }
    }

    #[test]
    fn test_new_record_is_pending_without_result() {
        let record = record();
        assert_eq!(record.status(), FileStatus::Pending);
        assert_eq!(record.size_bytes, 8);
        assert!(record.result().is_none());
        assert!(record.error().is_none());
        assert_eq!(record.attempts(), 0);
    }

    #[test]
    fn test_happy_path_attaches_result_and_drops_payload() {
        let mut record = record();
        assert_eq!(record.begin_processing().unwrap(), 1);
        record.complete(Vec::new()).unwrap();
        assert_eq!(record.status(), FileStatus::Done);
        assert_eq!(record.result().map(|r| r.len()), Some(0));
        assert!(record.raw_content().is_none());
    }

    #[test]
    fn test_failure_then_retry_returns_to_pending() {
        let mut record = record();
        record.begin_processing().unwrap();
        record.fail(failure()).unwrap();
        assert_eq!(record.status(), FileStatus::Error);
        assert!(record.result().is_none());
        assert!(record.raw_content().is_some());

        record.reset_for_retry().unwrap();
        assert_eq!(record.status(), FileStatus::Pending);
        assert!(record.error().is_none());
        assert_eq!(record.begin_processing().unwrap(), 2);
    }

    #[test]
    fn test_forward_only_transitions_are_enforced() {
        let mut record = record();
        let err = record.complete(Vec::new()).unwrap_err();
        assert_eq!(err.from, FileStatus::Pending);
        assert_eq!(err.to, FileStatus::Done);

        assert!(record.reset_for_retry().is_err());

        record.begin_processing().unwrap();
        assert!(record.begin_processing().is_err());
        record.complete(Vec::new()).unwrap();
        assert!(record.fail(failure()).is_err());
        assert!(record.reset_for_retry().is_err());
    }

    #[test]
    fn test_detail_view_carries_products_and_summary() {
        let mut record = record();
        assert!(FileDetailView::from(&record).summary.is_none());
        record.begin_processing().unwrap();
        record.complete(Vec::new()).unwrap();
        let detail = FileDetailView::from(&record);
        assert_eq!(detail.products.as_deref().map(<[_]>::len), Some(0));
        assert_eq!(detail.summary.map(|s| s.total_products), Some(0));
        assert_eq!(detail.file.product_count, Some(0));
    }

    #[test]
    fn test_file_kind_parses_request_types() {
        assert_eq!("pdf".parse::<FileKind>().unwrap(), FileKind::Pdf);
        assert_eq!("EXCEL".parse::<FileKind>().unwrap(), FileKind::Spreadsheet);
        assert!("docx".parse::<FileKind>().is_err());
        assert_eq!(FileKind::Spreadsheet.request_type(), "excel");
    }
}
