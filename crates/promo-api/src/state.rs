//! Application state shared by all handlers.

use promo_extract::ExtractionClient;
use promo_worker::ProcessingQueue;

use crate::services::ExportProxy;

#[derive(Clone)]
pub struct AppState {
    /// Error responses drop their details when set.
    pub is_production: bool,
    /// Registry and single-consumer processing queue.
    pub queue: ProcessingQueue,
    /// Used directly by the stateless `/process` endpoint.
    pub extraction: ExtractionClient,
    pub export: ExportProxy,
}
