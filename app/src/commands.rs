use analytics::AnalyticsService;
use budgets::BudgetService;
use clap::{Args, Subcommand};
use common::AppState;
use currency::money::{format_minor_units, to_minor_units};
use currency::{Currency, ExchangeRateService, HttpRateSource, RateOrigin, RateTable};
use database::Database;
use expenses::{Expense, ExpenseForm, ExpenseService, ExpenseUpdate};
use export::{ExportOptions, ExportService};
use receipts::ReceiptUpload;
use std::path::PathBuf;
use uuid::Uuid;

type Rates = ExchangeRateService<Database, HttpRateSource>;
type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Subcommand)]
pub enum Command {
    /// Record a new expense
    Add(AddArgs),
    /// Change fields of an existing expense
    Update {
        id: Uuid,
        #[command(flatten)]
        changes: UpdateArgs,
    },
    Delete {
        id: Uuid,
    },
    /// List expenses, newest first
    List {
        /// Only this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        json: bool,
    },
    Total,
    /// Attach a JPEG, PNG or WebP receipt image
    AttachReceipt {
        id: Uuid,
        path: PathBuf,
    },
    Budget {
        #[command(subcommand)]
        action: BudgetCommand,
    },
    /// Category breakdown, daily spending and budget progress
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Write expenses to a CSV file
    Export {
        #[arg(long)]
        from: Option<chrono::NaiveDate>,
        #[arg(long)]
        to: Option<chrono::NaiveDate>,
        #[arg(long)]
        currency: Option<Currency>,
        /// Defaults to a name derived from the range and currency
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show current exchange rates
    Rates {
        #[arg(long)]
        base: Option<Currency>,
    },
    Convert {
        amount: f64,
        from: Currency,
        to: Currency,
    },
    /// Generate any recurring expenses due today
    Recur,
}

#[derive(Subcommand)]
pub enum BudgetCommand {
    /// Set the monthly limit (in display currency units)
    Set { limit: f64 },
    Show,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    amount: String,
    #[arg(long)]
    category: String,
    /// YYYY-MM-DD, defaults to today
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    description: String,
    /// Currency the amount was paid in
    #[arg(long)]
    currency: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// weekly or monthly
    #[arg(long)]
    recurring: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    currency: Option<String>,
    /// Replaces all tags
    #[arg(long = "tag")]
    tags: Option<Vec<String>>,
    #[arg(long)]
    recurring: Option<String>,
    #[arg(long, conflicts_with = "recurring")]
    not_recurring: bool,
}

impl AddArgs {
    fn into_form(self, state: &AppState) -> ExpenseForm {
        ExpenseForm {
            amount: self.amount,
            category: self.category,
            date: self.date.unwrap_or_else(|| state.today().format("%Y-%m-%d").to_string()),
            description: self.description,
            currency: self.currency,
            tags: self.tags,
            is_recurring: self.recurring.is_some(),
            recurring_frequency: self.recurring,
        }
    }
}

impl UpdateArgs {
    fn into_update(self) -> ExpenseUpdate {
        let is_recurring = if self.not_recurring {
            Some(false)
        } else {
            self.recurring.as_ref().map(|_| true)
        };
        ExpenseUpdate {
            amount: self.amount,
            category: self.category,
            date: self.date,
            description: self.description,
            currency: self.currency,
            tags: self.tags,
            is_recurring,
            recurring_frequency: self.recurring,
        }
    }
}

pub async fn run(
    command: Command,
    state: &AppState,
    expenses: &mut ExpenseService<Database>,
    rates: &Rates,
) -> CliResult {
    let display = expenses.display_currency();

    match command {
        Command::Add(args) => {
            let entered = args.currency.as_deref().and_then(|code| code.parse().ok());
            let table = rates_for(rates, display, entered).await;
            let form = args.into_form(state);
            let expense = expenses.add(&form, table.as_ref()).await?;
            println!("Added {}", describe(&expense));
        }
        Command::Update { id, changes } => {
            // The merged record keeps its stored currency unless a new one is given.
            let entered = match changes.currency.as_deref() {
                Some(code) => code.parse().ok(),
                None => expenses.get(id).map(|e| e.entered_amount().1),
            };
            let table = rates_for(rates, display, entered).await;
            let expense = expenses.update(id, &changes.into_update(), table.as_ref()).await?;
            println!("Updated {}", describe(&expense));
        }
        Command::Delete { id } => {
            expenses.delete(id).await?;
            println!("Deleted {}", id);
        }
        Command::List { month, json } => {
            let list = match month {
                Some(month) => {
                    let mut in_month = AnalyticsService::in_month(expenses.expenses(), &month);
                    expenses::service::sort_newest_first(&mut in_month);
                    in_month
                }
                None => expenses.list(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if list.is_empty() {
                println!("No expenses");
            } else {
                for expense in &list {
                    println!("{}", describe(expense));
                }
            }
        }
        Command::Total => {
            println!("{}", money(expenses.total(), display));
        }
        Command::AttachReceipt { id, path } => {
            let bytes = tokio::fs::read(&path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = ReceiptUpload::from_file(&file_name, bytes);
            let expense = expenses.attach_receipt(id, &upload).await?;
            println!("Attached {} to {}", file_name, describe(&expense));
        }
        Command::Budget { action } => match action {
            BudgetCommand::Set { limit } => {
                let budget = BudgetService::set_budget(&state.db, limit, state.today()).await?;
                println!("Budget for {}: {}", budget.current_month, money(budget.monthly_limit, display));
            }
            BudgetCommand::Show => match BudgetService::current_budget(&state.db, state.today()).await? {
                Some(budget) => {
                    let status = AnalyticsService::budget_state(expenses.expenses(), &budget);
                    print_budget(&status, display);
                }
                None => println!("No budget set"),
            },
        },
        Command::Stats { json } => stats(state, expenses, json).await?,
        Command::Export { from, to, currency, out } => {
            let options = ExportOptions { start_date: from, end_date: to, currency };
            let table = match currency {
                Some(_) => Some(rates.rates(display).await.table),
                None => None,
            };
            let csv = ExportService::to_csv(expenses.expenses(), &options, table.as_ref())?;
            let path = out.unwrap_or_else(|| PathBuf::from(options.file_name(state.today())));
            tokio::fs::write(&path, csv).await?;
            println!("Wrote {}", path.display());
        }
        Command::Rates { base } => {
            let base = base.unwrap_or(display);
            let snapshot = rates.rates(base).await;
            if snapshot.origin == RateOrigin::Default {
                println!("Rates unavailable, showing built-in defaults");
            } else {
                println!("Rates as of {} ({:?})", snapshot.table.fetched_at.format("%Y-%m-%d %H:%M UTC"), snapshot.origin);
            }
            for (currency, rate) in &snapshot.table.rates {
                println!("1 {} = {:.4} {}", base, rate, currency);
            }
        }
        Command::Convert { amount, from, to } => {
            let converted = rates.convert(to_minor_units(amount), from, to).await?;
            println!("{} = {}", money(to_minor_units(amount), from), money(converted, to));
        }
        Command::Recur => {
            let created = expenses.generate_recurring(state.today()).await?;
            println!("Generated {} recurring expenses", created.len());
        }
    }

    Ok(())
}

/// Rates are only fetched when an entry is made in a foreign currency.
async fn rates_for(rates: &Rates, display: Currency, entered: Option<Currency>) -> Option<RateTable> {
    let entered = entered?;
    if entered == display {
        return None;
    }
    Some(rates.rates(display).await.table)
}

async fn stats(state: &AppState, expenses: &ExpenseService<Database>, json: bool) -> CliResult {
    let today = state.today();
    let window = state.config.window_days;
    let display = expenses.display_currency();
    let all = expenses.expenses();

    let breakdown = AnalyticsService::category_breakdown(all);
    let daily = AnalyticsService::daily_spending(all, today, window);
    let average = AnalyticsService::average_daily_spending(all, today, window);
    let summary = AnalyticsService::summary(all);
    let budget = BudgetService::current_budget(&state.db, today)
        .await?
        .map(|b| AnalyticsService::budget_state(all, &b));

    if json {
        let value = serde_json::json!({
            "summary": summary,
            "categories": breakdown,
            "daily": daily,
            "average_daily": average,
            "budget": budget,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} expenses, total {}", summary.count, money(summary.total, display));
    for entry in &breakdown {
        println!("  {:<14} {:>12} {:>6.2}%", entry.category, money(entry.amount, display), entry.percentage);
    }
    println!("Average per day over {} days: {}{:.2}", window, display.symbol(), average / 100.0);
    if let Some(status) = &budget {
        print_budget(status, display);
    }
    Ok(())
}

fn print_budget(status: &analytics::BudgetState, currency: Currency) {
    println!(
        "Budget {}: {} of {} ({}%)",
        status.month,
        money(status.current_month_spending, currency),
        money(status.monthly_limit, currency),
        status.percentage_used
    );
    if status.is_over_budget() {
        println!("Over budget by {}", money(status.overage(), currency));
    } else {
        println!("Remaining {}", money(status.remaining_budget, currency));
    }
}

fn money(cents: i64, currency: Currency) -> String {
    format!("{}{}", currency.symbol(), format_minor_units(cents))
}

fn describe(expense: &Expense) -> String {
    let mut line = format!(
        "{} {} {:<13} {} {}",
        expense.id,
        expense.date,
        expense.category,
        money(expense.amount, expense.currency),
        expense.description
    );
    if let (Some(amount), Some(currency)) = (expense.original_amount, expense.original_currency) {
        line.push_str(&format!(" (paid {})", money(amount, currency)));
    }
    if let Some(frequency) = expense.recurring_frequency {
        line.push_str(&format!(" [{}]", frequency));
    }
    if !expense.tags.is_empty() {
        let tags: Vec<&str> = expense.tags.iter().map(String::as_str).collect();
        line.push_str(&format!(" #{}", tags.join(" #")));
    }
    line
}
