use clap::Parser;
use common::{AppState, Config};
use currency::{Currency, ExchangeRateService, HttpRateSource};
use database::Database;
use expenses::ExpenseService;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Command;

#[derive(Parser)]
#[command(name = "expenses", version, about = "Personal expense tracker")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment and logging
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 2. Config from CLI args and env
    let cli = Cli::parse();
    let display_currency: Currency = cli.config.display_currency.parse()?;

    // 3. Database
    let db = Database::new(&cli.config.database_url).await?;
    db.run_migrations().await?;

    let state = AppState::new(db, cli.config.clone());

    // 4. Services
    let rate_source = HttpRateSource::new(&state.config.rates_api_url, state.clock.clone());
    let rates = ExchangeRateService::new(
        state.db.clone(),
        rate_source,
        state.clock.clone(),
        Duration::from_secs(state.config.rates_ttl_secs),
    );
    let mut expenses = ExpenseService::load(state.db.clone(), state.clock.clone(), display_currency).await;

    // Recurring instances are caught up on every start.
    match expenses.generate_recurring(state.today()).await {
        Ok(created) if !created.is_empty() => {
            tracing::info!("Generated {} recurring expenses", created.len());
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Recurring generation skipped: {}", e),
    }

    // 5. Dispatch
    commands::run(cli.command, &state, &mut expenses, &rates).await
}
