//! `data:<mime>;base64,<payload>` encoding used by the extraction call.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;

const PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingPrefix,
    #[error("data URI has no payload separator")]
    MissingSeparator,
    #[error("only base64 data URIs are supported")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// Encodes `bytes` as a base64 data URI with the standard padded alphabet.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("{}{}{},{}", PREFIX, mime, BASE64_MARKER, STANDARD.encode(bytes))
}

pub fn decode(uri: &str) -> Result<DataUri, DataUriError> {
    let rest = uri
        .trim()
        .strip_prefix(PREFIX)
        .ok_or(DataUriError::MissingPrefix)?;
    let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;
    let mime = header
        .strip_suffix(BASE64_MARKER)
        .ok_or(DataUriError::NotBase64)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| DataUriError::InvalidPayload(e.to_string()))?;

    Ok(DataUri {
        mime: mime.to_string(),
        bytes: Bytes::from(bytes),
    })
}
