pub mod models;
pub mod repository;
pub mod service;

pub use models::{Budget, SetBudgetRequest, MAX_MONTHLY_LIMIT};
pub use service::{BudgetError, BudgetService};
