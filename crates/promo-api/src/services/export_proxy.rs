//! Server-side proxy to the reporting export service.
//!
//! The date range arrives as query parameters and is forwarded as the
//! `Start-Date`/`End-Date` headers the upstream expects, together with the
//! configured private key.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde_json::Value;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use promo_core::Config;

const MAX_UPSTREAM_BODY_CHARS: usize = 2000;
const UNREADABLE_BODY: &str = "<failed to read upstream body>";
pub const DEFAULT_TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Upstream payload, decoded as JSON when the upstream says it is JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportBody {
    Json(Value),
    Text { content_type: String, body: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Missing required query params: startDate, endDate")]
    MissingDates,

    #[error("Server misconfiguration: CLOUD_RUN_PRIVATE_KEY is not set")]
    MissingPrivateKey,

    #[error("Server misconfiguration: EXPORT_UPSTREAM_URL is not set")]
    MissingUpstreamUrl,

    #[error("Upstream request failed")]
    Upstream {
        status: u16,
        status_text: String,
        trace: Option<String>,
        body: Value,
    },

    #[error("Timed out contacting upstream service")]
    Timeout(String),

    #[error("Unexpected server error")]
    Unexpected(String),
}

#[derive(Clone)]
pub struct ExportProxy {
    http_client: reqwest::Client,
    upstream_url: Option<String>,
    private_key: Option<String>,
}

impl Debug for ExportProxy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExportProxy")
            .field("upstream_url", &self.upstream_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ExportProxy {
    pub fn new(
        upstream_url: Option<String>,
        private_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for export proxy")?;

        Ok(Self {
            http_client,
            upstream_url,
            private_key,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.export_upstream_url().map(str::to_string),
            config.export_private_key().map(str::to_string),
            Duration::from_secs(config.export_timeout_secs()),
        )
    }

    /// Fetch the export for a date range. Dates are passed through verbatim.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<ExportBody, ExportError> {
        let (Some(start_date), Some(end_date)) = (
            start_date.filter(|d| !d.is_empty()),
            end_date.filter(|d| !d.is_empty()),
        ) else {
            return Err(ExportError::MissingDates);
        };
        let private_key = self
            .private_key
            .as_deref()
            .ok_or(ExportError::MissingPrivateKey)?;
        let url = self
            .upstream_url
            .as_deref()
            .ok_or(ExportError::MissingUpstreamUrl)?;

        let response = self
            .http_client
            .get(url)
            .header("Private-Key", private_key)
            .header("Start-Date", start_date)
            .header("End-Date", end_date)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let content_type = header_str(response.headers(), CONTENT_TYPE.as_str()).unwrap_or_default();
        let trace = header_str(response.headers(), "x-cloud-trace-context")
            .or_else(|| header_str(response.headers(), "x-request-id"));

        let body = match response.text().await {
            Ok(text) if content_type.contains("application/json") => {
                serde_json::from_str::<Value>(&text)
                    .map(ExportBody::Json)
                    .unwrap_or_else(|_| text_body(&content_type, UNREADABLE_BODY.to_string()))
            }
            Ok(text) => text_body(&content_type, text),
            Err(e) if e.is_timeout() => return Err(classify_transport_error(e)),
            Err(_) => text_body(&content_type, UNREADABLE_BODY.to_string()),
        };

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                trace = ?trace,
                "Export upstream returned an error"
            );
            let body = match body {
                ExportBody::Json(value) => value,
                ExportBody::Text { body, .. } => {
                    Value::String(body.chars().take(MAX_UPSTREAM_BODY_CHARS).collect())
                }
            };
            return Err(ExportError::Upstream {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                trace,
                body,
            });
        }

        Ok(body)
    }
}

fn text_body(content_type: &str, body: String) -> ExportBody {
    let content_type = if content_type.is_empty() {
        DEFAULT_TEXT_CONTENT_TYPE.to_string()
    } else {
        content_type.to_string()
    };
    ExportBody::Text { content_type, body }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn classify_transport_error(err: reqwest::Error) -> ExportError {
    if err.is_timeout() {
        ExportError::Timeout(err.to_string())
    } else {
        ExportError::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(url: Option<&str>, key: Option<&str>) -> ExportProxy {
        ExportProxy::new(
            url.map(str::to_string),
            key.map(str::to_string),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_dates_are_checked_first() {
        let err = proxy(None, None)
            .fetch(Some("2024-01-01"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::MissingDates));
    }

    #[tokio::test]
    async fn test_missing_key_is_a_misconfiguration() {
        let err = proxy(Some("http://localhost:1"), None)
            .fetch(Some("2024-01-01"), Some("2024-01-31"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Server misconfiguration: CLOUD_RUN_PRIVATE_KEY is not set"
        );
    }

    #[test]
    fn test_empty_content_type_defaults_to_plain_text() {
        assert_eq!(
            text_body("", "ok".to_string()),
            ExportBody::Text {
                content_type: DEFAULT_TEXT_CONTENT_TYPE.to_string(),
                body: "ok".to_string()
            }
        );
    }
}
