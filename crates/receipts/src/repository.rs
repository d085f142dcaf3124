use crate::models::{Receipt, ReceiptRef};
use database::{keys, KeyValueStore, RepositoryError};

pub(crate) struct ReceiptRepository<'a, S: KeyValueStore> {
    store: &'a S,
}

impl<'a, S: KeyValueStore> ReceiptRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn key(id: &ReceiptRef) -> String {
        format!("{}{}", keys::RECEIPT_PREFIX, id)
    }

    pub async fn create(&self, receipt: &Receipt) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(receipt)?;
        self.store.set(&Self::key(&receipt.id), &raw).await
    }

    pub async fn find_by_id(&self, id: &ReceiptRef) -> Result<Option<Receipt>, RepositoryError> {
        match self.store.get(&Self::key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &ReceiptRef) -> Result<(), RepositoryError> {
        self.store.remove(&Self::key(id)).await
    }
}
