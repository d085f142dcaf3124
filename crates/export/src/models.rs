use chrono::NaiveDate;
use currency::Currency;

/// Every recognised export option. `Default` exports everything in each record's own currency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    /// Inclusive.
    pub start_date: Option<NaiveDate>,
    /// Inclusive.
    pub end_date: Option<NaiveDate>,
    pub currency: Option<Currency>,
}

impl ExportOptions {
    pub fn includes(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start) && self.end_date.is_none_or(|end| date <= end)
    }

    /// `expenses_<date-or-range>[_<currency>].csv`
    pub fn file_name(&self, today: NaiveDate) -> String {
        let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
        let span = match (self.start_date, self.end_date) {
            (None, None) => fmt(today),
            (Some(start), Some(end)) => format!("{}_to_{}", fmt(start), fmt(end)),
            (Some(start), None) => format!("{}_to_{}", fmt(start), fmt(today)),
            (None, Some(end)) => format!("until_{}", fmt(end)),
        };
        match self.currency {
            Some(currency) => format!("expenses_{}_{}.csv", span, currency.code()),
            None => format!("expenses_{}.csv", span),
        }
    }
}
