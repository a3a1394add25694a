//! In-memory registry of uploaded files.
//!
//! Records are kept in upload order. The registry is owned by the
//! processing queue and only touched under its lock.

use bytes::Bytes;
use uuid::Uuid;

use promo_core::models::{
    ExtractedProduct, FileDetailView, FileKind, FileRecord, FileRecordView, FileStatus,
    RecordError, RegistrySummary,
};
use promo_core::validation::validate_intake;
use promo_core::{AppError, IntakeError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("File {0} not found")]
    NotFound(Uuid),

    #[error("File {id} is {status}, only failed files can be retried")]
    NotRetryable { id: Uuid, status: FileStatus },

    #[error("File {id} has already been attempted {attempts} times")]
    RetryLimitReached { id: Uuid, attempts: u32 },
}

impl From<RetryError> for AppError {
    fn from(err: RetryError) -> Self {
        let message = err.to_string();
        match err {
            RetryError::NotFound(_) => AppError::NotFound(message),
            RetryError::NotRetryable { .. } => AppError::Conflict(message),
            RetryError::RetryLimitReached { .. } => AppError::RetryLimitReached(message),
        }
    }
}

/// Work handed to the consumer when a record enters `Processing`.
#[derive(Debug, Clone)]
pub struct ClaimedFile {
    pub id: Uuid,
    pub attempt: u32,
    pub content: Bytes,
    pub content_type: String,
    pub kind: FileKind,
}

#[derive(Debug)]
pub struct Registry {
    records: Vec<FileRecord>,
    max_file_size_bytes: u64,
    max_manual_retries: Option<u32>,
}

impl Registry {
    pub fn new(max_file_size_bytes: u64, max_manual_retries: Option<u32>) -> Self {
        Self {
            records: Vec::new(),
            max_file_size_bytes,
            max_manual_retries,
        }
    }

    /// Validates and stores a new upload as `Pending`.
    pub fn intake(
        &mut self,
        name: &str,
        content_type: &str,
        content: Bytes,
    ) -> Result<FileRecordView, IntakeError> {
        let kind = validate_intake(
            name,
            content_type,
            content.len() as u64,
            self.max_file_size_bytes,
            self.records.iter().map(|r| (r.name.as_str(), r.size_bytes)),
        )?;

        let record = FileRecord::new(name.to_string(), content_type.to_string(), kind, content);
        let view = FileRecordView::from(&record);
        self.records.push(record);
        Ok(view)
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<FileRecordView> {
        self.records.iter().rev().map(FileRecordView::from).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn detail(&self, id: Uuid) -> Option<FileDetailView> {
        self.get(id).map(FileDetailView::from)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<FileRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    /// Moves a `Pending` record to `Processing`. Returns `None` if the record
    /// was removed or is no longer pending.
    pub fn claim(&mut self, id: Uuid) -> Option<ClaimedFile> {
        let record = self.get_mut(id)?;
        if record.status() != FileStatus::Pending {
            return None;
        }
        let content = record.raw_content()?.clone();
        let attempt = record.begin_processing().ok()?;

        Some(ClaimedFile {
            id,
            attempt,
            content,
            content_type: record.content_type.clone(),
            kind: record.kind,
        })
    }

    /// Attaches a result to the attempt that produced it. Returns `false`
    /// (and changes nothing) when that attempt is no longer current.
    pub fn complete(&mut self, id: Uuid, attempt: u32, products: Vec<ExtractedProduct>) -> bool {
        match self.current_attempt(id, attempt) {
            Some(record) => record.complete(products).is_ok(),
            None => false,
        }
    }

    pub fn fail(&mut self, id: Uuid, attempt: u32, error: RecordError) -> bool {
        match self.current_attempt(id, attempt) {
            Some(record) => record.fail(error).is_ok(),
            None => false,
        }
    }

    /// `Error -> Pending`, subject to the manual retry cap.
    pub fn retry(&mut self, id: Uuid) -> Result<FileRecordView, RetryError> {
        let max = self.max_manual_retries;
        let record = self.get_mut(id).ok_or(RetryError::NotFound(id))?;

        if record.status() != FileStatus::Error {
            return Err(RetryError::NotRetryable {
                id,
                status: record.status(),
            });
        }
        if let Some(max) = max {
            // The first attempt is automatic; only the rest count against the cap.
            if record.attempts() > max {
                return Err(RetryError::RetryLimitReached {
                    id,
                    attempts: record.attempts(),
                });
            }
        }

        record
            .reset_for_retry()
            .map_err(|e| RetryError::NotRetryable { id, status: e.from })?;
        Ok(FileRecordView::from(&*record))
    }

    pub fn summary(&self) -> RegistrySummary {
        self.records.iter().map(FileRecord::status).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut FileRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    fn current_attempt(&mut self, id: Uuid, attempt: u32) -> Option<&mut FileRecord> {
        self.get_mut(id)
            .filter(|r| r.status() == FileStatus::Processing && r.attempts() == attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promo_core::models::FailureKind;

    const PDF: &str = "application/pdf";

    fn registry() -> Registry {
        Registry::new(1024 * 1024, Some(1))
    }

    fn failure() -> RecordError {
        RecordError {
            kind: FailureKind::UpstreamMalformedResponse,
            message: "bad payload".to_string(),
        }
    }

    #[test]
    fn test_duplicate_name_and_size_is_rejected_without_a_record() {
        let mut registry = registry();
        registry
            .intake("promo.pdf", PDF, Bytes::from_static(b"%PDF-1"))
            .unwrap();
        let err = registry
            .intake("promo.pdf", PDF, Bytes::from_static(b"%PDF-2"))
            .unwrap_err();
        assert!(matches!(err, IntakeError::DuplicateFile { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let mut registry = registry();
        let first = registry.intake("a.pdf", PDF, Bytes::from_static(b"a")).unwrap();
        let second = registry.intake("b.pdf", PDF, Bytes::from_static(b"b")).unwrap();
        let ids: Vec<Uuid> = registry.list().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_claim_only_pending_records() {
        let mut registry = registry();
        let view = registry.intake("a.pdf", PDF, Bytes::from_static(b"a")).unwrap();
        let claimed = registry.claim(view.id).unwrap();
        assert_eq!(claimed.attempt, 1);
        assert!(registry.claim(view.id).is_none());
        assert!(registry.claim(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_stale_attempt_results_are_discarded() {
        let mut registry = registry();
        let view = registry.intake("a.pdf", PDF, Bytes::from_static(b"a")).unwrap();
        registry.claim(view.id).unwrap();
        assert!(!registry.complete(view.id, 7, Vec::new()));
        assert_eq!(registry.get(view.id).unwrap().status(), FileStatus::Processing);

        registry.remove(view.id).unwrap();
        assert!(!registry.complete(view.id, 1, Vec::new()));
    }

    #[test]
    fn test_retry_respects_the_cap() {
        let mut registry = registry();
        let view = registry.intake("a.pdf", PDF, Bytes::from_static(b"a")).unwrap();

        assert!(matches!(
            registry.retry(view.id),
            Err(RetryError::NotRetryable { .. })
        ));

        registry.claim(view.id).unwrap();
        assert!(registry.fail(view.id, 1, failure()));
        let retried = registry.retry(view.id).unwrap();
        assert_eq!(retried.status, FileStatus::Pending);
        assert!(retried.error.is_none());

        registry.claim(view.id).unwrap();
        assert!(registry.fail(view.id, 2, failure()));
        let err = registry.retry(view.id).unwrap_err();
        assert_eq!(
            err,
            RetryError::RetryLimitReached {
                id: view.id,
                attempts: 2
            }
        );
    }

    #[test]
    fn test_summary_counts_statuses() {
        let mut registry = registry();
        let a = registry.intake("a.pdf", PDF, Bytes::from_static(b"a")).unwrap();
        registry.intake("b.pdf", PDF, Bytes::from_static(b"b")).unwrap();
        registry.claim(a.id).unwrap();
        registry.complete(a.id, 1, Vec::new());

        let summary = registry.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.done, 1);
        assert_eq!(summary.pending, 1);
    }
}
