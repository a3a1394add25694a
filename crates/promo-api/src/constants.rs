//! API constants

/// Versioned prefix for the file registry routes.
pub const API_PREFIX: &str = "/api/v0";

/// Multipart parts accepted in a single upload request.
pub const MAX_FILES_PER_UPLOAD: usize = 10;

/// Extra room for multipart framing on top of the file payloads.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Requests served concurrently before new ones wait for a slot.
pub const HTTP_CONCURRENCY_LIMIT: usize = 1024;
