use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use database::Database;
use std::sync::Arc;

pub mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// Longest trailing window (about ten years) analytics will build.
pub const MAX_WINDOW_DAYS: u32 = 3660;

#[derive(Clone, Debug, Args)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:expenses.db")]
    pub database_url: String,

    #[arg(long, env = "RATES_API_URL", default_value = "https://api.exchangerate-api.com/v4/latest")]
    pub rates_api_url: String,

    /// Currency every stored amount is converted into (USD, EUR or GBP)
    #[arg(long, env = "DISPLAY_CURRENCY", default_value = "USD")]
    pub display_currency: String,

    /// How long a fetched rate table is considered fresh
    #[arg(long, env = "RATES_TTL_SECS", default_value = "3600")]
    pub rates_ttl_secs: u64,

    /// Trailing window used by daily spending and averages
    #[arg(
        long,
        env = "WINDOW_DAYS",
        default_value = "30",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_WINDOW_DAYS))
    )]
    pub window_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:expenses.db".to_string(),
            rates_api_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            display_currency: "USD".to_string(),
            rates_ttl_secs: 3600,
            window_days: 30,
        }
    }
}

/// `YYYY-MM` for the month containing `date`.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}
