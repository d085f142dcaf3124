use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum CurrencyError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("No exchange rate available for {0}")]
    MissingRate(Currency),
    #[error("Failed to fetch exchange rates: {0}")]
    Fetch(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Gbp];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            _ => Err(CurrencyError::UnsupportedCurrency(s.trim().to_string())),
        }
    }
}

/// Rates relative to `base`, i.e. one unit of `base` buys `rates[c]` units of `c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub base: Currency,
    pub rates: BTreeMap<Currency, f64>,
    pub fetched_at: DateTime<Utc>,
}

// USD-based fallback used when nothing was ever fetched.
const DEFAULT_USD_RATES: [(Currency, f64); 3] = [
    (Currency::Usd, 1.0),
    (Currency::Eur, 0.92),
    (Currency::Gbp, 0.79),
];

impl RateTable {
    pub fn new(base: Currency, rates: BTreeMap<Currency, f64>, fetched_at: DateTime<Utc>) -> Self {
        let mut rates = rates;
        rates.entry(base).or_insert(1.0);
        Self { base, rates, fetched_at }
    }

    /// Built-in constants, re-based on `base`. `fetched_at` is the epoch so it is always stale.
    pub fn defaults(base: Currency) -> Self {
        let base_in_usd = DEFAULT_USD_RATES
            .iter()
            .find(|(c, _)| *c == base)
            .map(|(_, r)| *r)
            .unwrap_or(1.0);
        let rates = DEFAULT_USD_RATES
            .iter()
            .map(|(c, r)| (*c, r / base_in_usd))
            .collect();
        Self::new(base, rates, DateTime::<Utc>::default())
    }

    pub fn rate(&self, currency: Currency) -> Result<f64, CurrencyError> {
        match self.rates.get(&currency) {
            Some(rate) if rate.is_finite() && *rate > 0.0 => Ok(*rate),
            _ => Err(CurrencyError::MissingRate(currency)),
        }
    }
}

/// Convert `amount` (minor units) from `from` to `to`, pivoting through the table's base.
pub fn convert(amount: i64, from: Currency, to: Currency, table: &RateTable) -> Result<i64, CurrencyError> {
    if from == to {
        return Ok(amount);
    }

    let in_base = if from == table.base {
        amount as f64
    } else {
        amount as f64 / table.rate(from)?
    };

    let converted = if to == table.base {
        in_base
    } else {
        in_base * table.rate(to)?
    };

    Ok(converted.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RateTable {
        let rates = BTreeMap::from([
            (Currency::Usd, 1.0),
            (Currency::Eur, 0.85),
            (Currency::Gbp, 0.73),
        ]);
        RateTable::new(Currency::Usd, rates, Utc::now())
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" GBP ".parse::<Currency>().unwrap(), Currency::Gbp);
        assert_eq!(
            "JPY".parse::<Currency>(),
            Err(CurrencyError::UnsupportedCurrency("JPY".into()))
        );
    }

    #[test]
    fn test_currency_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Currency::Eur).unwrap(), "\"EUR\"");
        let t = table();
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"GBP\":0.73"));
        let back: RateTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_convert_identity() {
        let t = table();
        for c in Currency::ALL {
            assert_eq!(convert(12345, c, c, &t).unwrap(), 12345);
        }
        // identity holds even without any rates
        let empty = RateTable { base: Currency::Usd, rates: BTreeMap::new(), fetched_at: Utc::now() };
        assert_eq!(convert(500, Currency::Gbp, Currency::Gbp, &empty).unwrap(), 500);
    }

    #[test]
    fn test_convert_from_and_to_base() {
        let t = table();
        assert_eq!(convert(10000, Currency::Usd, Currency::Eur, &t).unwrap(), 8500);
        assert_eq!(convert(8500, Currency::Eur, Currency::Usd, &t).unwrap(), 10000);
    }

    #[test]
    fn test_convert_cross_rate() {
        let t = table();
        // 100 EUR -> 117.647 USD -> 85.88 GBP
        assert_eq!(convert(10000, Currency::Eur, Currency::Gbp, &t).unwrap(), 8588);
    }

    #[test]
    fn test_convert_round_trip() {
        let t = table();
        for amount in [1, 99, 1234, 50000, 99999999] {
            for (a, b) in [(Currency::Usd, Currency::Eur), (Currency::Eur, Currency::Gbp), (Currency::Gbp, Currency::Usd)] {
                let there = convert(amount, a, b, &t).unwrap();
                let back = convert(there, b, a, &t).unwrap();
                assert!((back - amount).abs() <= 1, "{amount} {a}->{b}->{a} gave {back}");
            }
        }
    }

    #[test]
    fn test_convert_missing_rate() {
        let mut t = table();
        t.rates.remove(&Currency::Gbp);
        assert_eq!(
            convert(100, Currency::Usd, Currency::Gbp, &t),
            Err(CurrencyError::MissingRate(Currency::Gbp))
        );
        assert_eq!(
            convert(100, Currency::Gbp, Currency::Eur, &t),
            Err(CurrencyError::MissingRate(Currency::Gbp))
        );
    }

    #[test]
    fn test_defaults_rebased() {
        let eur = RateTable::defaults(Currency::Eur);
        assert_eq!(eur.base, Currency::Eur);
        assert!((eur.rate(Currency::Eur).unwrap() - 1.0).abs() < 1e-9);
        let usd_per_eur = eur.rate(Currency::Usd).unwrap();
        assert!((usd_per_eur - 1.0 / 0.92).abs() < 1e-9);
    }
}
