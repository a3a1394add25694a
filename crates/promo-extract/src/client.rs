use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use promo_core::models::{ExtractedProduct, FileKind};
use promo_core::validation::normalize_content_type;
use promo_core::Config;

use crate::backend::{ExtractionBackend, ExtractionRequest, HttpExtractionBackend};
use crate::data_uri;
use crate::error::ExtractionError;
use crate::schema::parse_products;
use crate::workbook::first_sheet_to_csv;

const CSV_CONTENT_TYPE: &str = "text/csv";

/// Turns an uploaded file into validated product rows.
///
/// Spreadsheets are converted to CSV before the call (CSV input is sent
/// unchanged); PDFs are sent as-is.
/// The returned rows always carry every required field.
///
/// Clones share one gate: at most one extraction call is in flight across
/// the queue consumer and the inline `/process` path.
#[derive(Clone)]
pub struct ExtractionClient {
    backend: Arc<dyn ExtractionBackend>,
    gate: Arc<Semaphore>,
    timeout: Duration,
    workbook_timeout: Duration,
}

impl ExtractionClient {
    pub fn new(
        backend: Arc<dyn ExtractionBackend>,
        timeout: Duration,
        workbook_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            gate: Arc::new(Semaphore::new(1)),
            timeout,
            workbook_timeout,
        }
    }

    /// HTTP-backed client built from the application configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backend = HttpExtractionBackend::new(
            config.extraction_url(),
            config.extraction_api_key().map(str::to_string),
        )?;
        Ok(Self::new(
            Arc::new(backend),
            Duration::from_secs(config.extraction_timeout_secs()),
            Duration::from_secs(config.workbook_timeout_secs()),
        ))
    }

    pub async fn extract(
        &self,
        bytes: Bytes,
        content_type: &str,
        kind: FileKind,
    ) -> Result<Vec<ExtractedProduct>, ExtractionError> {
        self.extract_with_cancel(bytes, content_type, kind, &CancellationToken::new())
            .await
    }

    /// Like [`Self::extract`], abandoning the attempt as soon as `cancel` fires.
    #[tracing::instrument(skip(self, bytes, cancel), fields(size = bytes.len()))]
    pub async fn extract_with_cancel(
        &self,
        bytes: Bytes,
        content_type: &str,
        kind: FileKind,
        cancel: &CancellationToken,
    ) -> Result<Vec<ExtractedProduct>, ExtractionError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Extraction cancelled");
                Err(ExtractionError::Cancelled)
            }
            result = self.run(bytes, content_type, kind) => result,
        }
    }

    async fn run(
        &self,
        bytes: Bytes,
        content_type: &str,
        kind: FileKind,
    ) -> Result<Vec<ExtractedProduct>, ExtractionError> {
        let mime = normalize_content_type(content_type);
        let file_data_uri = match kind {
            // Already tabular text, nothing to convert.
            FileKind::Spreadsheet if mime == CSV_CONTENT_TYPE => {
                data_uri::encode(CSV_CONTENT_TYPE, &bytes)
            }
            FileKind::Spreadsheet => {
                let csv = self.convert_workbook(bytes).await?;
                data_uri::encode(CSV_CONTENT_TYPE, &csv)
            }
            FileKind::Pdf => data_uri::encode(&mime, &bytes),
        };

        let request = ExtractionRequest {
            file_data_uri,
            file_type: kind.request_type().to_string(),
        };

        // The timeout starts once the gate is held.
        let _permit = self.gate.acquire().await.map_err(|_| {
            ExtractionError::UpstreamUnavailable("Extraction gate closed".to_string())
        })?;
        let body = tokio::time::timeout(self.timeout, self.backend.extract(&request))
            .await
            .map_err(|_| {
                ExtractionError::UpstreamUnavailable(format!(
                    "Extraction timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;

        let parsed = parse_products(&body)?;
        if parsed.dropped > 0 {
            tracing::debug!(
                dropped = parsed.dropped,
                kept = parsed.products.len(),
                "Dropped rows missing required fields"
            );
        }
        if parsed.products.is_empty() {
            tracing::info!("Extraction returned no usable rows");
        }

        Ok(parsed.products)
    }

    async fn convert_workbook(&self, bytes: Bytes) -> Result<Vec<u8>, ExtractionError> {
        let task = tokio::task::spawn_blocking(move || first_sheet_to_csv(&bytes));
        match tokio::time::timeout(self.workbook_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ExtractionError::MalformedWorkbook(format!(
                "Workbook conversion failed: {}",
                join_err
            ))),
            Err(_) => Err(ExtractionError::MalformedWorkbook(format!(
                "Workbook conversion timed out after {}s",
                self.workbook_timeout.as_secs()
            ))),
        }
    }
}
