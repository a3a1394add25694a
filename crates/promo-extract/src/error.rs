use promo_core::models::{FailureKind, RecordError};

/// Failure of a single extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// The spreadsheet could not be decoded or converted to CSV.
    #[error("{0}")]
    MalformedWorkbook(String),

    /// Timeout, transport failure or a transient upstream status.
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// The upstream answered with something that is not a usable payload.
    #[error("{0}")]
    UpstreamMalformedResponse(String),

    /// The attempt was abandoned because its file was removed.
    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractionError {
    /// Classification stored on a failed record. `None` for cancellation,
    /// which never reaches a record.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ExtractionError::MalformedWorkbook(_) => Some(FailureKind::MalformedWorkbook),
            ExtractionError::UpstreamUnavailable(_) => Some(FailureKind::UpstreamUnavailable),
            ExtractionError::UpstreamMalformedResponse(_) => {
                Some(FailureKind::UpstreamMalformedResponse)
            }
            ExtractionError::Cancelled => None,
        }
    }

    pub fn to_record_error(&self) -> Option<RecordError> {
        self.failure_kind().map(|kind| RecordError {
            kind,
            message: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_has_no_record_error() {
        assert!(ExtractionError::Cancelled.to_record_error().is_none());
        let err = ExtractionError::UpstreamUnavailable("timed out after 60s".to_string());
        let record = err.to_record_error().unwrap();
        assert_eq!(record.kind, FailureKind::UpstreamUnavailable);
        assert_eq!(record.message, "timed out after 60s");
    }
}
