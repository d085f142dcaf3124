//! Amounts are carried as integer minor units (cents) everywhere.

pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// `1234` -> `"12.34"`, `-5` -> `"-0.05"`.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
