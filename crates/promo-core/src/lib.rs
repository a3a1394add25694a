//! Promo Core Library
//!
//! Domain models, error types, configuration and intake validation shared by
//! the extraction client, the processing queue and the HTTP service.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, LogFormat, ProcessorConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use validation::IntakeError;
