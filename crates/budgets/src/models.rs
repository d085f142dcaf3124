use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MAX_MONTHLY_LIMIT: f64 = 1_000_000.0;

/// The single monthly spending ceiling.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Budget {
    pub monthly_limit: i64, // Cents
    pub current_month: String, // YYYY-MM
}

impl Budget {
    pub fn is_for(&self, today: NaiveDate) -> bool {
        self.current_month == common::month_key(today)
    }

    /// Same limit, moved to the month containing `today`.
    pub fn rolled_to(&self, today: NaiveDate) -> Budget {
        Budget {
            monthly_limit: self.monthly_limit,
            current_month: common::month_key(today),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SetBudgetRequest {
    monthly_limit: i64,
    month: String,
}

impl SetBudgetRequest {
    pub fn new(limit_dollars: f64, today: NaiveDate) -> Result<Self, String> {
        if !limit_dollars.is_finite() {
            return Err("Monthly limit must be a number".to_string());
        }

        if limit_dollars > MAX_MONTHLY_LIMIT {
            return Err("Monthly limit cannot exceed 1,000,000".to_string());
        }

        let monthly_limit = (limit_dollars * 100.0).round() as i64;
        if monthly_limit <= 0 {
            return Err("Monthly limit must be greater than 0".to_string());
        }

        Ok(Self {
            monthly_limit,
            month: common::month_key(today),
        })
    }

    pub fn into_budget(self) -> Budget {
        Budget {
            monthly_limit: self.monthly_limit,
            current_month: self.month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 9).unwrap()
    }

    #[test]
    fn test_set_budget_request_valid() {
        let budget = SetBudgetRequest::new(1000.0, today()).unwrap().into_budget();
        assert_eq!(budget.monthly_limit, 100_000);
        assert_eq!(budget.current_month, "2025-07");
    }

    #[test]
    fn test_set_budget_request_invalid() {
        assert!(SetBudgetRequest::new(0.0, today()).is_err());
        assert!(SetBudgetRequest::new(-5.0, today()).is_err());
        assert!(SetBudgetRequest::new(f64::NAN, today()).is_err());
    }

    #[test]
    fn test_set_budget_request_upper_bound() {
        let at_cap = SetBudgetRequest::new(MAX_MONTHLY_LIMIT, today()).unwrap().into_budget();
        assert_eq!(at_cap.monthly_limit, 100_000_000);

        assert!(SetBudgetRequest::new(1_000_000.01, today()).is_err());
        assert!(SetBudgetRequest::new(1e300, today()).is_err());
    }

    #[test]
    fn test_roll_over() {
        let budget = SetBudgetRequest::new(250.0, today()).unwrap().into_budget();
        let august = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert!(budget.is_for(today()));
        assert!(!budget.is_for(august));

        let rolled = budget.rolled_to(august);
        assert_eq!(rolled.current_month, "2025-08");
        assert_eq!(rolled.monthly_limit, budget.monthly_limit);
    }
}
