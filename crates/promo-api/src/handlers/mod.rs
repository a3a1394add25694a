pub mod export;
pub mod files;
pub mod process;

use serde::Serialize;
use utoipa::ToSchema;

/// `{ message, error? }` body used by the `/process` and `/export` endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    pub fn with_error(message: impl Into<String>, error: impl ToString) -> Self {
        Self {
            message: message.into(),
            error: Some(error.to_string()),
        }
    }
}
