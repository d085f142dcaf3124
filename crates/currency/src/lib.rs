pub mod client;
pub mod models;
pub mod money;
pub mod repository;
pub mod service;

pub use client::{HttpRateSource, RateSource};
pub use models::{convert, Currency, CurrencyError, RateTable};
pub use service::{ExchangeRateService, RateOrigin, RateSnapshot};
