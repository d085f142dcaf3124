//! Field rules for expense forms. `validate` reports every broken rule, not just the first.

use crate::models::{Category, ExpenseForm, Frequency};
use chrono::NaiveDate;
use currency::money::to_minor_units;
use currency::Currency;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const MAX_AMOUNT: f64 = 1_000_000.0;
pub const MAX_DESCRIPTION_LEN: usize = 200;
pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LEN: usize = 20;

// Report order for field errors.
const FIELDS: [&str; 6] = ["amount", "category", "date", "description", "tags", "currency"];

pub fn validate(form: &ExpenseForm, today: NaiveDate) -> Vec<String> {
    let mut messages = Vec::new();

    let field_errors = form.validate().err();
    let by_field = field_errors.as_ref().map(|e| e.field_errors()).unwrap_or_default();
    for field in FIELDS {
        // Tags are checked one by one so every bad tag is reported.
        if field == "tags" {
            messages.extend(tag_errors(&form.tags));
            continue;
        }
        if let Some(errs) = by_field.get(field) {
            for err in errs.iter() {
                let msg = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                messages.push(msg);
            }
        }
    }

    if let Ok(date) = parse_date(&form.date) {
        if date > today {
            messages.push("Date cannot be in the future".to_string());
        }
    }

    if form.is_recurring {
        match form.recurring_frequency.as_deref().map(str::trim) {
            None | Some("") => {
                messages.push("Recurring expenses need a frequency (weekly or monthly)".to_string())
            }
            Some(raw) => {
                if let Err(e) = raw.parse::<Frequency>() {
                    messages.push(e);
                }
            }
        }
    }

    messages
}

pub fn parse_amount(raw: &str) -> Result<i64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| "Amount must be a number".to_string())?;

    if !value.is_finite() {
        return Err("Amount must be a number".to_string());
    }
    if value <= 0.0 {
        return Err("Amount must be greater than 0".to_string());
    }
    if value > MAX_AMOUNT {
        return Err("Amount cannot exceed 1,000,000".to_string());
    }

    let cents = to_minor_units(value);
    if cents < 1 {
        return Err("Amount must be at least 0.01".to_string());
    }
    Ok(cents)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| "Date must be a valid date (YYYY-MM-DD)".to_string())
}

pub fn parse_currency(raw: &str) -> Result<Currency, String> {
    raw.parse::<Currency>().map_err(|_| {
        let codes: Vec<&str> = Currency::ALL.iter().map(|c| c.code()).collect();
        format!("Currency must be one of {}", codes.join(", "))
    })
}

pub fn parse_description(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Description is required".to_string());
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(format!("Description must be at most {} characters", MAX_DESCRIPTION_LEN));
    }
    Ok(trimmed.to_string())
}

pub fn check_tag(tag: &str) -> Result<(), String> {
    if tag.trim().is_empty() {
        return Err("Tags cannot be empty".to_string());
    }
    if tag.trim() != tag {
        return Err(format!("Tag '{}' has leading or trailing whitespace", tag));
    }
    if tag.contains(',') {
        return Err(format!("Tag '{}' cannot contain commas", tag));
    }
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(format!("Tag '{}' must be at most {} characters", tag, MAX_TAG_LEN));
    }
    Ok(())
}

fn rule_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

pub(crate) fn check_amount(amount: &str) -> Result<(), ValidationError> {
    parse_amount(amount).map(|_| ()).map_err(|m| rule_error("amount", m))
}

pub(crate) fn check_category(category: &str) -> Result<(), ValidationError> {
    category.parse::<Category>().map(|_| ()).map_err(|m| rule_error("category", m))
}

pub(crate) fn check_date(date: &str) -> Result<(), ValidationError> {
    parse_date(date).map(|_| ()).map_err(|m| rule_error("date", m))
}

pub(crate) fn check_description(description: &str) -> Result<(), ValidationError> {
    parse_description(description).map(|_| ()).map_err(|m| rule_error("description", m))
}

pub(crate) fn check_currency(currency: &str) -> Result<(), ValidationError> {
    parse_currency(currency).map(|_| ()).map_err(|m| rule_error("currency", m))
}

/// One message per broken tag rule: the count limit and every bad tag.
pub fn tag_errors(tags: &[String]) -> Vec<String> {
    let mut messages = Vec::new();
    if tags.len() > MAX_TAGS {
        messages.push(format!("No more than {} tags allowed", MAX_TAGS));
    }
    messages.extend(tags.iter().filter_map(|tag| check_tag(tag).err()));
    messages
}
