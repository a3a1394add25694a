pub mod file;
pub mod product;
pub mod summary;

pub use file::{
    FailureKind, FileDetailView, FileKind, FileRecord, FileRecordView, FileStatus, RecordError,
    TransitionError,
};
pub use product::ExtractedProduct;
pub use summary::{ProcessingSummary, RegistrySummary};
