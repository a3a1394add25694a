//! Service initialization and application state setup

use anyhow::{Context, Result};
use promo_core::Config;
use promo_extract::ExtractionClient;
use promo_worker::{FileProcessor, ProcessingQueue, QueueConfig};
use std::sync::Arc;

use crate::services::ExportProxy;
use crate::state::AppState;

/// Build the extraction client, the processing queue and the export proxy.
pub fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let extraction =
        ExtractionClient::from_config(config).context("Failed to create extraction client")?;
    let processor: Arc<dyn FileProcessor> = Arc::new(extraction.clone());

    build_state(config, extraction, processor)
}

/// Assemble the state around an explicit queue processor.
///
/// Must be called inside a Tokio runtime: the queue consumer is spawned here.
pub fn build_state(
    config: &Config,
    extraction: ExtractionClient,
    processor: Arc<dyn FileProcessor>,
) -> Result<Arc<AppState>> {
    let queue_config = QueueConfig::from_config(config);
    tracing::info!(
        max_file_size_bytes = queue_config.max_file_size_bytes,
        max_manual_retries = ?queue_config.max_manual_retries,
        processing_timeout_secs = queue_config.processing_timeout.as_secs(),
        "Processing queue configured"
    );
    let queue = ProcessingQueue::new(queue_config, processor);

    let export = ExportProxy::from_config(config).context("Failed to create export proxy")?;
    if config.export_upstream_url().is_none() {
        tracing::warn!("EXPORT_UPSTREAM_URL not set, /export will report a misconfiguration");
    }

    Ok(Arc::new(AppState {
        is_production: config.is_production(),
        queue,
        extraction,
        export,
    }))
}
