use crate::models::{Currency, RateTable};
use database::{keys, KeyValueStore, RepositoryError};

pub(crate) struct RateCacheRepository<'a, S: KeyValueStore> {
    store: &'a S,
}

impl<'a, S: KeyValueStore> RateCacheRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    fn key(base: Currency) -> String {
        format!("{}{}", keys::EXCHANGE_RATES_PREFIX, base.code())
    }

    pub async fn load(&self, base: Currency) -> Result<Option<RateTable>, RepositoryError> {
        match self.store.get(&Self::key(base)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, table: &RateTable) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(table)?;
        self.store.set(&Self::key(table.base), &raw).await
    }
}
