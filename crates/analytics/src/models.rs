use chrono::NaiveDate;
use expenses::Category;
use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: Category,
    pub amount: i64, // Cents
    pub percentage: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub amount: i64, // Cents
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BudgetState {
    pub month: String,
    pub monthly_limit: i64,
    pub current_month_spending: i64,
    /// Never negative.
    pub remaining_budget: i64,
    /// Capped at 100 even when over budget.
    pub percentage_used: u32,
}

impl BudgetState {
    /// Signed headroom: negative once spending passes the limit.
    pub fn difference(&self) -> i64 {
        self.monthly_limit - self.current_month_spending
    }

    pub fn is_over_budget(&self) -> bool {
        self.current_month_spending > self.monthly_limit
    }

    pub fn overage(&self) -> i64 {
        (self.current_month_spending - self.monthly_limit).max(0)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SpendingSummary {
    pub total: i64,
    pub count: usize,
    pub average_expense: f64,
}
