use crate::models::{BudgetState, CategoryTotal, DailyTotal, SpendingSummary};
use budgets::Budget;
use chrono::{Duration, NaiveDate};
use common::MAX_WINDOW_DAYS;
use currency::money::round2;
use expenses::{Category, Expense};

pub struct AnalyticsService;

impl AnalyticsService {
    /// Spend per category, largest first. Empty categories are left out.
    pub fn category_breakdown(expenses: &[Expense]) -> Vec<CategoryTotal> {
        let total: i64 = expenses.iter().map(|e| e.amount).sum();
        if total <= 0 {
            return Vec::new();
        }

        let mut rows: Vec<CategoryTotal> = Category::ALL
            .iter()
            .map(|category| {
                let amount: i64 = expenses
                    .iter()
                    .filter(|e| e.category == *category)
                    .map(|e| e.amount)
                    .sum();
                CategoryTotal {
                    category: *category,
                    amount,
                    percentage: round2(amount as f64 / total as f64 * 100.0),
                }
            })
            .filter(|row| row.amount > 0)
            .collect();

        rows.sort_by(|a, b| b.amount.cmp(&a.amount));
        rows
    }

    /// One entry per day for the `window_days` days ending on `today`, oldest first.
    /// Days without spending are present with 0.
    pub fn daily_spending(expenses: &[Expense], today: NaiveDate, window_days: u32) -> Vec<DailyTotal> {
        let window_days = window_days.min(MAX_WINDOW_DAYS);
        if window_days == 0 {
            return Vec::new();
        }
        let Some(start) = today.checked_sub_signed(Duration::days(i64::from(window_days) - 1)) else {
            return Vec::new();
        };

        let mut days: Vec<DailyTotal> = (0..i64::from(window_days))
            .map(|offset| DailyTotal {
                date: start + Duration::days(offset),
                amount: 0,
            })
            .collect();

        for expense in expenses {
            let offset = (expense.date - start).num_days();
            if let Ok(index) = usize::try_from(offset) {
                if let Some(day) = days.get_mut(index) {
                    day.amount += expense.amount;
                }
            }
        }

        days
    }

    pub fn budget_state(expenses: &[Expense], budget: &Budget) -> BudgetState {
        let spent: i64 = expenses
            .iter()
            .filter(|e| e.month() == budget.current_month)
            .map(|e| e.amount)
            .sum();

        let limit = budget.monthly_limit;
        let percentage_used = if limit > 0 {
            (spent as f64 / limit as f64 * 100.0).round().clamp(0.0, 100.0) as u32
        } else {
            0
        };

        BudgetState {
            month: budget.current_month.clone(),
            monthly_limit: limit,
            current_month_spending: spent,
            remaining_budget: (limit - spent).max(0),
            percentage_used,
        }
    }

    /// Trailing-window spend divided by the full window length, in cents.
    ///
    /// The divisor is always `window_days`, also when the records do not
    /// reach back that far.
    pub fn average_daily_spending(expenses: &[Expense], today: NaiveDate, window_days: u32) -> f64 {
        let window_days = window_days.min(MAX_WINDOW_DAYS);
        if window_days == 0 {
            return 0.0;
        }
        let total: i64 = Self::daily_spending(expenses, today, window_days)
            .iter()
            .map(|d| d.amount)
            .sum();
        total as f64 / f64::from(window_days)
    }

    /// Records whose date falls in `month` (YYYY-MM).
    pub fn in_month(expenses: &[Expense], month: &str) -> Vec<Expense> {
        expenses
            .iter()
            .filter(|e| e.month() == month)
            .cloned()
            .collect()
    }

    pub fn summary(expenses: &[Expense]) -> SpendingSummary {
        let total: i64 = expenses.iter().map(|e| e.amount).sum();
        let count = expenses.len();
        let average_expense = if count == 0 { 0.0 } else { total as f64 / count as f64 };
        SpendingSummary { total, count, average_expense }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use currency::Currency;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(amount: i64, category: Category, on: NaiveDate) -> Expense {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4(),
            amount,
            currency: Currency::Usd,
            original_amount: None,
            original_currency: None,
            category,
            date: on,
            description: "test".into(),
            tags: BTreeSet::new(),
            is_recurring: false,
            recurring_frequency: None,
            recurring_parent_id: None,
            receipt: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_category_breakdown() {
        let day = date(2025, 4, 2);
        let list = vec![
            expense(3000, Category::Food, day),
            expense(1000, Category::Transport, day),
            expense(2000, Category::Food, day),
            expense(4000, Category::Bills, day),
        ];

        let rows = AnalyticsService::category_breakdown(&list);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].category, Category::Food);
        assert_eq!(rows[0].amount, 5000);
        assert_eq!(rows[0].percentage, 50.0);
        assert_eq!(rows[1].category, Category::Bills);
        assert_eq!(rows[2].category, Category::Transport);
        assert_eq!(rows[2].percentage, 10.0);
        assert!(rows.iter().all(|r| r.category != Category::Shopping));
    }

    #[test]
    fn test_category_breakdown_percentages_sum_to_100() {
        let day = date(2025, 4, 2);
        let list = vec![
            expense(100, Category::Food, day),
            expense(100, Category::Transport, day),
            expense(100, Category::Shopping, day),
            expense(333, Category::Other, day),
            expense(7, Category::Entertainment, day),
        ];
        let sum: f64 = AnalyticsService::category_breakdown(&list)
            .iter()
            .map(|r| r.percentage)
            .sum();
        assert!((sum - 100.0).abs() < 0.05, "sum was {sum}");
    }

    #[test]
    fn test_category_breakdown_empty() {
        assert!(AnalyticsService::category_breakdown(&[]).is_empty());
    }

    #[test]
    fn test_daily_spending_covers_every_day() {
        let today = date(2025, 3, 10);
        assert_eq!(AnalyticsService::daily_spending(&[], today, 30).len(), 30);

        let list = vec![
            expense(500, Category::Food, today),
            expense(250, Category::Food, today),
            expense(900, Category::Bills, date(2025, 2, 9)), // first day of window
            expense(111, Category::Bills, date(2025, 2, 8)), // just outside
            expense(222, Category::Bills, date(2025, 3, 11)), // after today
        ];
        let days = AnalyticsService::daily_spending(&list, today, 30);

        assert_eq!(days.len(), 30);
        assert_eq!(days[0].date, date(2025, 2, 9));
        assert_eq!(days[0].amount, 900);
        assert_eq!(days[29].date, today);
        assert_eq!(days[29].amount, 750);
        assert!(days.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(days.iter().map(|d| d.amount).sum::<i64>(), 1650);
    }

    #[test]
    fn test_budget_state_over_budget() {
        let budget = Budget { monthly_limit: 100_000, current_month: "2025-06".into() };
        let list = vec![
            expense(50_000, Category::Food, date(2025, 6, 1)),
            expense(60_000, Category::Bills, date(2025, 6, 1)),
            expense(99_999, Category::Bills, date(2025, 5, 31)),
        ];

        let state = AnalyticsService::budget_state(&list, &budget);
        assert_eq!(state.current_month_spending, 110_000);
        assert_eq!(state.remaining_budget, 0);
        assert_eq!(state.percentage_used, 100);
        assert!(state.is_over_budget());
        assert_eq!(state.overage(), 10_000);
        assert_eq!(state.difference(), -10_000);
    }

    #[test]
    fn test_budget_state_under_budget() {
        let budget = Budget { monthly_limit: 40_000, current_month: "2025-06".into() };
        let list = vec![expense(10_000, Category::Food, date(2025, 6, 12))];

        let state = AnalyticsService::budget_state(&list, &budget);
        assert_eq!(state.remaining_budget, 30_000);
        assert_eq!(state.percentage_used, 25);
        assert!(!state.is_over_budget());
        assert_eq!(state.overage(), 0);
    }

    #[test]
    fn test_budget_state_zero_limit() {
        let budget = Budget { monthly_limit: 0, current_month: "2025-06".into() };
        let list = vec![expense(10_000, Category::Food, date(2025, 6, 12))];
        assert_eq!(AnalyticsService::budget_state(&list, &budget).percentage_used, 0);
    }

    #[test]
    fn test_average_daily_spending_uses_fixed_divisor() {
        let today = date(2025, 3, 10);
        let list = vec![
            expense(3000, Category::Food, today),
            expense(3000, Category::Food, date(2025, 3, 9)),
            expense(9999, Category::Food, date(2024, 1, 1)),
        ];
        assert_eq!(AnalyticsService::average_daily_spending(&list, today, 30), 200.0);
        assert_eq!(AnalyticsService::average_daily_spending(&list, today, 0), 0.0);
    }

    #[test]
    fn test_oversized_window_is_capped() {
        let today = date(2025, 3, 10);
        let list = vec![expense(3660, Category::Food, today)];

        let days = AnalyticsService::daily_spending(&list, today, 200_000_000);
        assert_eq!(days.len(), MAX_WINDOW_DAYS as usize);
        assert_eq!(days.last().map(|d| d.date), Some(today));
        assert_eq!(AnalyticsService::average_daily_spending(&list, today, 200_000_000), 1.0);

        let early = NaiveDate::MIN + Duration::days(5);
        assert_eq!(AnalyticsService::daily_spending(&[], early, 30), Vec::new());
    }

    #[test]
    fn test_in_month_and_summary() {
        let list = vec![
            expense(100, Category::Food, date(2025, 6, 1)),
            expense(300, Category::Food, date(2025, 6, 30)),
            expense(500, Category::Food, date(2025, 7, 1)),
        ];
        let june = AnalyticsService::in_month(&list, "2025-06");
        assert_eq!(june.len(), 2);

        let summary = AnalyticsService::summary(&june);
        assert_eq!(summary.total, 400);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average_expense, 200.0);

        assert_eq!(AnalyticsService::summary(&[]).average_expense, 0.0);
    }
}
