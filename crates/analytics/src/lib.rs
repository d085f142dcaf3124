//! Derived figures over an expense list. Everything is recomputed from scratch on each call.

pub mod models;
pub mod service;

pub use models::{BudgetState, CategoryTotal, DailyTotal, SpendingSummary};
pub use service::AnalyticsService;
