use crate::models::Budget;
use database::{keys, KeyValueStore, RepositoryError};

pub(crate) struct BudgetRepository<'a, S: KeyValueStore> {
    store: &'a S,
}

impl<'a, S: KeyValueStore> BudgetRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> Result<Option<Budget>, RepositoryError> {
        match self.store.get(keys::BUDGET).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    // Replaced wholesale.
    pub async fn put(&self, budget: &Budget) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(budget)?;
        self.store.set(keys::BUDGET, &raw).await
    }
}
