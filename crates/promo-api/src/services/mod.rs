pub mod export_proxy;

pub use export_proxy::{ExportBody, ExportError, ExportProxy};
