use crate::client::RateSource;
use crate::models::{convert, Currency, CurrencyError, RateTable};
use crate::repository::RateCacheRepository;
use common::Clock;
use database::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_RATES_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    /// Just fetched from the source.
    Fresh,
    /// Served from a cache entry younger than the TTL.
    Cached,
    /// Fetch failed, served from an expired cache entry.
    Stale,
    /// Fetch failed and nothing was cached.
    Default,
}

#[derive(Debug, Clone)]
pub struct RateSnapshot {
    pub table: RateTable,
    pub origin: RateOrigin,
}

pub struct ExchangeRateService<S: KeyValueStore, R: RateSource> {
    store: S,
    source: R,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<S: KeyValueStore, R: RateSource> ExchangeRateService<S, R> {
    pub fn new(store: S, source: R, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, source, clock, ttl }
    }

    pub fn with_default_ttl(store: S, source: R, clock: Arc<dyn Clock>) -> Self {
        Self::new(store, source, clock, DEFAULT_RATES_TTL)
    }

    fn is_fresh(&self, table: &RateTable) -> bool {
        let age = self.clock.now().signed_duration_since(table.fetched_at);
        match age.to_std() {
            Ok(age) => age < self.ttl,
            // fetched "in the future": do not trust it
            Err(_) => false,
        }
    }

    /// Never fails: degrades to a stale cache entry, then to built-in defaults.
    #[instrument(skip(self))]
    pub async fn rates(&self, base: Currency) -> RateSnapshot {
        let repo = RateCacheRepository::new(&self.store);

        let cached = repo.load(base).await.unwrap_or_else(|e| {
            tracing::warn!("Could not read cached rates for {}: {}", base, e);
            None
        });

        if let Some(table) = &cached {
            if self.is_fresh(table) {
                return RateSnapshot { table: table.clone(), origin: RateOrigin::Cached };
            }
        }

        match self.source.fetch(base).await {
            Ok(table) => {
                if let Err(e) = repo.save(&table).await {
                    tracing::warn!("Could not cache rates for {}: {}", base, e);
                }
                RateSnapshot { table, origin: RateOrigin::Fresh }
            }
            Err(e) => match cached {
                Some(table) => {
                    tracing::warn!("Rate fetch failed ({}), using cache from {}", e, table.fetched_at);
                    RateSnapshot { table, origin: RateOrigin::Stale }
                }
                None => {
                    tracing::warn!("Rate fetch failed ({}) and no cache, using defaults", e);
                    RateSnapshot { table: RateTable::defaults(base), origin: RateOrigin::Default }
                }
            },
        }
    }

    /// Conversion as the primary action: a missing rate is a hard error.
    #[instrument(skip(self))]
    pub async fn convert(&self, amount: i64, from: Currency, to: Currency) -> Result<i64, CurrencyError> {
        if from == to {
            return Ok(amount);
        }
        let snapshot = self.rates(from).await;
        convert(amount, from, to, &snapshot.table).map_err(|e| {
            tracing::error!("Conversion {} -> {} failed: {}", from, to, e);
            e
        })
    }
}
