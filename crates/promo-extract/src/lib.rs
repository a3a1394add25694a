//! Promo Extract Library
//!
//! Client for the hosted extraction service. Files are encoded as data URIs
//! (spreadsheets are converted to CSV first), posted to the service, and the
//! response is parsed into validated [`promo_core::models::ExtractedProduct`]
//! rows.

pub mod backend;
pub mod client;
pub mod data_uri;
pub mod error;
pub mod schema;
pub mod workbook;

pub use backend::{ExtractionBackend, ExtractionRequest, HttpExtractionBackend};
pub use client::ExtractionClient;
pub use error::ExtractionError;
