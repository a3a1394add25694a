//! Promo API Library
//!
//! HTTP surface of the promo file processor: the file registry routes, the
//! stateless `/process` endpoint, the `/export` reporting proxy and health
//! checks.

mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
pub mod services;
pub mod setup;
mod telemetry;
mod utils;

pub mod error;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
