//! Promo Worker Library
//!
//! Owns the file registry and runs the single consumer that sends pending
//! files through extraction, one at a time, in upload order.

pub mod context;
pub mod queue;
pub mod registry;

pub use context::FileProcessor;
pub use queue::{BatchOutcome, ProcessingQueue, QueueConfig, QueueEvent, Upload};
pub use registry::{ClaimedFile, Registry, RetryError};
