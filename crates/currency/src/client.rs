use crate::models::{Currency, CurrencyError, RateTable};
use common::Clock;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

/// Anything that can produce a fresh rate table for a base currency.
pub trait RateSource: Send + Sync {
    fn fetch(&self, base: Currency) -> impl Future<Output = Result<RateTable, CurrencyError>> + Send;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Public exchange-rate API: `GET {base_url}/{BASE}` -> `{ "rates": { "EUR": 0.92, ... } }`.
#[derive(Clone)]
pub struct HttpRateSource {
    base_url: String,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
}

impl HttpRateSource {
    pub fn new(base_url: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            clock,
        }
    }

    fn endpoint(&self, base: Currency) -> String {
        format!("{}/{}", self.base_url, base.code())
    }
}

impl RateSource for HttpRateSource {
    async fn fetch(&self, base: Currency) -> Result<RateTable, CurrencyError> {
        let url = self.endpoint(base);
        tracing::debug!("Fetching exchange rates from {}", url);

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| CurrencyError::Fetch(e.to_string()))?;

        let res = res
            .error_for_status()
            .map_err(|e| CurrencyError::Fetch(e.to_string()))?;

        let body = res
            .json::<RatesResponse>()
            .await
            .map_err(|e| CurrencyError::Fetch(e.to_string()))?;

        Ok(table_from_response(base, body.rates, self.clock.now()))
    }
}

// Only the supported currencies are kept from the response.
fn table_from_response(
    base: Currency,
    raw: HashMap<String, f64>,
    fetched_at: chrono::DateTime<chrono::Utc>,
) -> RateTable {
    let rates: BTreeMap<Currency, f64> = Currency::ALL
        .iter()
        .filter_map(|c| raw.get(c.code()).map(|r| (*c, *r)))
        .collect();
    RateTable::new(base, rates, fetched_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::SystemClock;

    #[test]
    fn test_table_from_response_keeps_supported_codes() {
        let raw: RatesResponse = serde_json::from_str(
            r#"{"base":"USD","rates":{"USD":1,"EUR":0.91,"GBP":0.78,"JPY":150.2}}"#,
        )
        .unwrap();
        let table = table_from_response(Currency::Usd, raw.rates, Utc::now());
        assert_eq!(table.rates.len(), 3);
        assert_eq!(table.rate(Currency::Eur).unwrap(), 0.91);
    }

    #[test]
    fn test_table_from_response_fills_base() {
        let raw = HashMap::from([("USD".to_string(), 1.08)]);
        let table = table_from_response(Currency::Eur, raw, Utc::now());
        assert_eq!(table.rate(Currency::Eur).unwrap(), 1.0);
        assert!(table.rate(Currency::Gbp).is_err());
    }

    #[test]
    fn test_endpoint() {
        let source = HttpRateSource::new("https://rates.example/latest/", Arc::new(SystemClock));
        assert_eq!(source.endpoint(Currency::Gbp), "https://rates.example/latest/GBP");
    }
}
