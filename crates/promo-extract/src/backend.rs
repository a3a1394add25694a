//! Extraction backends
//!
//! A backend performs the remote extraction call and returns the raw response
//! body. [`HttpExtractionBackend`] posts to the hosted extraction endpoint;
//! tests provide their own implementations.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::error::ExtractionError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Body of the extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub file_data_uri: String,
    /// `"pdf"` or `"excel"`.
    pub file_type: String,
}

#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Performs one extraction call and returns the successful response body.
    async fn extract(&self, request: &ExtractionRequest) -> Result<Bytes, ExtractionError>;
}

/// JSON-over-HTTP extraction backend.
#[derive(Clone)]
pub struct HttpExtractionBackend {
    http_client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl Debug for HttpExtractionBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("HttpExtractionBackend")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Error envelope returned by the extraction service.
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl HttpExtractionBackend {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for extraction service")?;

        Ok(Self {
            http_client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ExtractionBackend for HttpExtractionBackend {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Bytes, ExtractionError> {
        let mut builder = self.http_client.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            ExtractionError::UpstreamUnavailable(format!(
                "Failed to reach extraction service: {}",
                e
            ))
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            ExtractionError::UpstreamUnavailable(format!(
                "Failed to read extraction response: {}",
                e
            ))
        })?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_status(status, &body))
        }
    }
}

/// Maps a non-2xx extraction response to an error, keeping the upstream
/// `{message, error}` text when the body carries one.
pub fn classify_status(status: StatusCode, body: &[u8]) -> ExtractionError {
    let detail = match serde_json::from_slice::<UpstreamErrorBody>(body) {
        Ok(UpstreamErrorBody {
            message: Some(message),
            error: Some(error),
        }) => format!("{}: {}", message, error),
        Ok(UpstreamErrorBody {
            message: Some(text),
            error: None,
        })
        | Ok(UpstreamErrorBody {
            message: None,
            error: Some(text),
        }) => text,
        _ => String::from_utf8_lossy(body)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect(),
    };

    let message = if detail.trim().is_empty() {
        format!("Extraction service returned {}", status)
    } else {
        format!("Extraction service returned {}: {}", status, detail.trim())
    };

    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        ExtractionError::UpstreamUnavailable(message)
    } else {
        ExtractionError::UpstreamMalformedResponse(message)
    }
}
