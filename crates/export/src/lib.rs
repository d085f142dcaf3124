pub mod models;
pub mod service;

pub use models::ExportOptions;
pub use service::{ExportError, ExportService, CSV_HEADER};
