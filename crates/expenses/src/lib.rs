pub mod models;
pub mod recurring;
pub mod repository;
pub mod service;
pub mod validation;

pub use models::{Category, Expense, ExpenseForm, ExpenseUpdate, Frequency, NewExpense};
pub use service::{ExpenseError, ExpenseService};
