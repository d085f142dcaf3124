use crate::models::Expense;
use database::{keys, KeyValueStore, RepositoryError};

/// The whole collection lives under one key and is rewritten on every change.
pub(crate) struct ExpenseRepository<'a, S: KeyValueStore> {
    store: &'a S,
}

impl<'a, S: KeyValueStore> ExpenseRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Vec<Expense>, RepositoryError> {
        match self.store.get(keys::EXPENSES).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save(&self, expenses: &[Expense]) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(expenses)?;
        self.store.set(keys::EXPENSES, &raw).await
    }
}
