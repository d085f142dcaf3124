use crate::validation;
use chrono::{DateTime, NaiveDate, Utc};
use currency::money::format_minor_units;
use currency::Currency;
use receipts::ReceiptRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Bills,
    Entertainment,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Shopping,
        Category::Bills,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
                format!("Category must be one of {}", names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Weekly => f.write_str("weekly"),
            Frequency::Monthly => f.write_str("monthly"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err("Recurring frequency must be weekly or monthly".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub amount: i64, // Cents, in `currency`
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub original_amount: Option<i64>,
    #[serde(default)]
    pub original_currency: Option<Currency>,
    pub category: Category,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_frequency: Option<Frequency>,
    #[serde(default)]
    pub recurring_parent_id: Option<Uuid>,
    #[serde(default)]
    pub receipt: Option<ReceiptRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Amount as the user typed it, before any conversion.
    pub fn entered_amount(&self) -> (i64, Currency) {
        match (self.original_amount, self.original_currency) {
            (Some(amount), Some(currency)) => (amount, currency),
            _ => (self.amount, self.currency),
        }
    }

    pub fn has_receipt(&self) -> bool {
        self.receipt.is_some()
    }

    pub fn month(&self) -> String {
        common::month_key(self.date)
    }
}

/// Form input exactly as it arrives from the user, every field still text.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ExpenseForm {
    #[validate(custom(function = "validation::check_amount"))]
    pub amount: String,
    #[validate(custom(function = "validation::check_category"))]
    pub category: String,
    #[validate(custom(function = "validation::check_date"))]
    pub date: String,
    #[validate(custom(function = "validation::check_description"))]
    pub description: String,
    #[validate(custom(function = "validation::check_currency"))]
    pub currency: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurring_frequency: Option<String>,
}

impl ExpenseForm {
    /// Form pre-filled from a stored expense, using the as-entered amount.
    pub fn from_expense(expense: &Expense) -> Self {
        let (amount, currency) = expense.entered_amount();
        Self {
            amount: format_minor_units(amount),
            category: expense.category.name().to_string(),
            date: expense.date.format("%Y-%m-%d").to_string(),
            description: expense.description.clone(),
            currency: Some(currency.code().to_string()),
            tags: expense.tags.iter().cloned().collect(),
            is_recurring: expense.is_recurring,
            recurring_frequency: expense.recurring_frequency.map(|f| f.to_string()),
        }
    }
}

/// Partial edit; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseUpdate {
    pub amount: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub currency: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_recurring: Option<bool>,
    pub recurring_frequency: Option<String>,
}

impl ExpenseUpdate {
    /// True when the amount or its currency is being edited.
    pub fn changes_money(&self) -> bool {
        self.amount.is_some() || self.currency.is_some()
    }

    pub fn merge(&self, existing: &Expense) -> ExpenseForm {
        let mut form = ExpenseForm::from_expense(existing);
        if let Some(amount) = &self.amount {
            form.amount = amount.clone();
        }
        if let Some(category) = &self.category {
            form.category = category.clone();
        }
        if let Some(date) = &self.date {
            form.date = date.clone();
        }
        if let Some(description) = &self.description {
            form.description = description.clone();
        }
        if let Some(currency) = &self.currency {
            form.currency = Some(currency.clone());
        }
        if let Some(tags) = &self.tags {
            form.tags = tags.clone();
        }
        if let Some(is_recurring) = self.is_recurring {
            form.is_recurring = is_recurring;
        }
        if let Some(frequency) = &self.recurring_frequency {
            form.recurring_frequency = Some(frequency.clone());
        }
        form
    }
}

// ENCAPSULATION: once built via new(), every field is known to be valid.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    amount: i64,
    currency: Option<Currency>,
    category: Category,
    date: NaiveDate,
    description: String,
    tags: BTreeSet<String>,
    recurring_frequency: Option<Frequency>,
}

impl NewExpense {
    pub fn new(form: &ExpenseForm, today: NaiveDate) -> Result<Self, Vec<String>> {
        let errors = validation::validate(form, today);
        if !errors.is_empty() {
            return Err(errors);
        }

        let one = |e: String| vec![e];
        let currency = match &form.currency {
            Some(code) => Some(validation::parse_currency(code).map_err(one)?),
            None => None,
        };
        let recurring_frequency = if form.is_recurring {
            let raw = form.recurring_frequency.as_deref().unwrap_or_default();
            Some(raw.parse::<Frequency>().map_err(one)?)
        } else {
            None
        };

        Ok(Self {
            amount: validation::parse_amount(&form.amount).map_err(one)?,
            currency,
            category: form.category.parse().map_err(one)?,
            date: validation::parse_date(&form.date).map_err(one)?,
            description: form.description.trim().to_string(),
            tags: form.tags.iter().cloned().collect(),
            recurring_frequency,
        })
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> Option<Currency> {
        self.currency
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring_frequency.is_some()
    }

    pub fn recurring_frequency(&self) -> Option<Frequency> {
        self.recurring_frequency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
    }

    fn form() -> ExpenseForm {
        ExpenseForm {
            amount: "45.50".into(),
            category: "food".into(),
            date: "2025-05-19".into(),
            description: "  Groceries  ".into(),
            tags: vec!["weekly".into(), "home".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_new_expense_valid() {
        let new = NewExpense::new(&form(), today()).unwrap();
        assert_eq!(new.amount(), 4550);
        assert_eq!(new.category(), Category::Food);
        assert_eq!(new.description(), "Groceries");
        assert_eq!(new.tags().len(), 2);
        assert!(!new.is_recurring());
        assert_eq!(new.currency(), None);
    }

    #[test]
    fn test_new_expense_recurring() {
        let mut f = form();
        f.is_recurring = true;
        f.recurring_frequency = Some("Monthly".into());
        let new = NewExpense::new(&f, today()).unwrap();
        assert_eq!(new.recurring_frequency(), Some(Frequency::Monthly));
    }

    #[test]
    fn test_new_expense_invalid() {
        let mut f = form();
        f.amount = "-3".into();
        f.description = "   ".into();
        let errors = NewExpense::new(&f, today()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("BILLS".parse::<Category>().unwrap(), Category::Bills);
        assert!("Rent".parse::<Category>().is_err());
    }

    #[test]
    fn test_expense_deserializes_older_shape() {
        let raw = r#"{
            "id": "6f1c1a4e-8a53-4f57-9a0e-4d5f5cf1e001",
            "amount": 1200,
            "category": "Transport",
            "date": "2025-01-03",
            "description": "Bus pass",
            "created_at": "2025-01-03T10:00:00Z",
            "updated_at": "2025-01-03T10:00:00Z"
        }"#;
        let expense: Expense = serde_json::from_str(raw).unwrap();
        assert_eq!(expense.currency, Currency::Usd);
        assert!(expense.tags.is_empty());
        assert!(!expense.is_recurring);
        assert!(!expense.has_receipt());
        assert_eq!(expense.month(), "2025-01");
    }

    #[test]
    fn test_update_merge_keeps_unspecified_fields() {
        let new = NewExpense::new(&form(), today()).unwrap();
        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4(),
            amount: new.amount(),
            currency: Currency::Usd,
            original_amount: None,
            original_currency: None,
            category: new.category(),
            date: new.date(),
            description: new.description().to_string(),
            tags: new.tags().clone(),
            is_recurring: false,
            recurring_frequency: None,
            recurring_parent_id: None,
            receipt: None,
            created_at: now,
            updated_at: now,
        };

        let update = ExpenseUpdate { amount: Some("60".into()), ..Default::default() };
        let merged = update.merge(&expense);
        assert_eq!(merged.amount, "60");
        assert_eq!(merged.description, "Groceries");
        assert_eq!(merged.category, "Food");
        assert_eq!(merged.date, "2025-05-19");
        assert_eq!(merged.currency.as_deref(), Some("USD"));
    }
}
