//! File processor trait
//!
//! The queue calls `process` for each dequeued record. The production
//! implementation is [`ExtractionClient`]; tests substitute their own.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use promo_core::models::{ExtractedProduct, FileKind};
use promo_extract::{ExtractionClient, ExtractionError};

#[async_trait]
pub trait FileProcessor: Send + Sync {
    /// Extract rows from one file. Must return promptly with
    /// [`ExtractionError::Cancelled`] once `cancel` fires.
    async fn process(
        &self,
        content: Bytes,
        content_type: &str,
        kind: FileKind,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExtractedProduct>, ExtractionError>;
}

#[async_trait]
impl FileProcessor for ExtractionClient {
    async fn process(
        &self,
        content: Bytes,
        content_type: &str,
        kind: FileKind,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExtractedProduct>, ExtractionError> {
        self.extract_with_cancel(content, content_type, kind, cancel)
            .await
    }
}
