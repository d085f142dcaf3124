use crate::models::{Receipt, ReceiptRef, ReceiptUpload};
use crate::repository::ReceiptRepository;
use chrono::{DateTime, Utc};
use database::{KeyValueStore, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum ReceiptError {
    #[error("Unsupported receipt type: {0} (expected JPEG, PNG or WebP)")]
    UnsupportedType(String),
    #[error("Receipt is too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("Receipt file is empty")]
    Empty,
    #[error("Receipt storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ReceiptError {
    fn from(err: RepositoryError) -> Self {
        ReceiptError::Storage(err.to_string())
    }
}

pub struct ReceiptService;

impl ReceiptService {
    /// Rejects bad files before anything is written.
    #[instrument(skip(store, upload), fields(file = %upload.file_name, size = upload.bytes.len()))]
    pub async fn upload<S: KeyValueStore>(
        store: &S,
        upload: &ReceiptUpload,
        now: DateTime<Utc>,
    ) -> Result<ReceiptRef, ReceiptError> {
        let kind = upload.validate().map_err(|e| {
            tracing::warn!("Rejected receipt upload: {}", e);
            e
        })?;

        let receipt = Receipt::new(upload, kind, now);
        let repo = ReceiptRepository::new(store);
        repo.create(&receipt).await?;

        Ok(receipt.id)
    }

    #[instrument(skip(store))]
    pub async fn get<S: KeyValueStore>(store: &S, id: &ReceiptRef) -> Result<Option<Receipt>, ReceiptError> {
        let repo = ReceiptRepository::new(store);
        Ok(repo.find_by_id(id).await?)
    }

    #[instrument(skip(store))]
    pub async fn delete<S: KeyValueStore>(store: &S, id: &ReceiptRef) -> Result<(), ReceiptError> {
        let repo = ReceiptRepository::new(store);
        repo.delete(id).await?;
        Ok(())
    }
}
