pub mod models;
pub mod repository;
pub mod service;

pub use models::{ImageKind, Receipt, ReceiptRef, ReceiptUpload, MAX_RECEIPT_BYTES};
pub use service::{ReceiptError, ReceiptService};
