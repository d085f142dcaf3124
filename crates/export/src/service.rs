use crate::models::ExportOptions;
use currency::money::format_minor_units;
use currency::{convert, Currency, RateTable};
use expenses::service::sort_newest_first;
use expenses::Expense;

pub const CSV_HEADER: [&str; 13] = [
    "Date",
    "Description",
    "Category",
    "Original Amount",
    "Original Currency",
    "Amount",
    "Currency",
    "Tags",
    "Recurring",
    "Frequency",
    "Has Receipt",
    "Created At",
    "Updated At",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Invalid date range: {0} is after {1}")]
    InvalidRange(chrono::NaiveDate, chrono::NaiveDate),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub struct ExportService;

impl ExportService {
    /// CSV text, newest first. A record whose amount cannot be converted
    /// keeps its as-entered amount instead of failing the export.
    #[tracing::instrument(skip(expenses, rates), fields(records = expenses.len()))]
    pub fn to_csv(
        expenses: &[Expense],
        options: &ExportOptions,
        rates: Option<&RateTable>,
    ) -> Result<String, ExportError> {
        if let (Some(start), Some(end)) = (options.start_date, options.end_date) {
            if start > end {
                return Err(ExportError::InvalidRange(start, end));
            }
        }

        let mut rows: Vec<Expense> = expenses
            .iter()
            .filter(|e| options.includes(e.date))
            .cloned()
            .collect();
        sort_newest_first(&mut rows);

        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;

        for expense in &rows {
            let (original_amount, original_currency) = expense.entered_amount();
            let (amount, currency) = Self::display_amount(expense, options.currency, rates);
            let tags: Vec<&str> = expense.tags.iter().map(String::as_str).collect();

            wtr.write_record([
                expense.date.format("%Y-%m-%d").to_string(),
                expense.description.clone(),
                expense.category.to_string(),
                format_minor_units(original_amount),
                original_currency.code().to_string(),
                format_minor_units(amount),
                currency.code().to_string(),
                tags.join(";"),
                if expense.is_recurring { "yes" } else { "no" }.to_string(),
                expense.recurring_frequency.map(|f| f.to_string()).unwrap_or_default(),
                if expense.has_receipt() { "yes" } else { "no" }.to_string(),
                expense.created_at.to_rfc3339(),
                expense.updated_at.to_rfc3339(),
            ])?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| ExportError::Encoding(e.to_string()))?;
        String::from_utf8(data).map_err(|e| ExportError::Encoding(e.to_string()))
    }

    fn display_amount(expense: &Expense, wanted: Option<Currency>, rates: Option<&RateTable>) -> (i64, Currency) {
        let (original_amount, original_currency) = expense.entered_amount();
        let Some(target) = wanted else {
            return (expense.amount, expense.currency);
        };

        if target == original_currency {
            return (original_amount, original_currency);
        }
        if target == expense.currency {
            return (expense.amount, expense.currency);
        }

        let converted = match rates {
            Some(table) => convert(original_amount, original_currency, target, table),
            None => Err(currency::CurrencyError::MissingRate(target)),
        };
        match converted {
            Ok(amount) => (amount, target),
            Err(e) => {
                tracing::warn!("Exporting expense {} unconverted: {}", expense.id, e);
                (original_amount, original_currency)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use expenses::{Category, Frequency};
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(description: &str, amount: i64, on: NaiveDate) -> Expense {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        Expense {
            id: Uuid::new_v4(),
            amount,
            currency: Currency::Usd,
            original_amount: None,
            original_currency: None,
            category: Category::Food,
            date: on,
            description: description.into(),
            tags: BTreeSet::new(),
            is_recurring: false,
            recurring_frequency: None,
            recurring_parent_id: None,
            receipt: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn rates() -> RateTable {
        let rates = BTreeMap::from([(Currency::Usd, 1.0), (Currency::Eur, 0.5)]);
        RateTable::new(Currency::Usd, rates, Utc::now())
    }

    fn parse(csv_text: &str) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
        rdr.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_header_only_for_empty_input() {
        let out = ExportService::to_csv(&[], &ExportOptions::default(), None).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("Date,Description,Category,Original Amount,Original Currency,Amount,Currency"));
    }

    #[test]
    fn test_quotes_special_characters() {
        let list = vec![expense(r#"He said, "hi""#, 1000, date(2025, 1, 5))];
        let out = ExportService::to_csv(&list, &ExportOptions::default(), None).unwrap();

        assert!(out.contains(r#","He said, ""hi""","#), "{out}");
        let records = parse(&out);
        assert_eq!(&records[0][1], r#"He said, "hi""#);
    }

    #[test]
    fn test_newline_round_trips() {
        let list = vec![expense("line one\nline two", 1000, date(2025, 1, 5))];
        let out = ExportService::to_csv(&list, &ExportOptions::default(), None).unwrap();
        assert_eq!(&parse(&out)[0][1], "line one\nline two");
    }

    #[test]
    fn test_filters_and_sorts_newest_first() {
        let mut same_day_later = expense("later entry", 300, date(2025, 1, 10));
        same_day_later.created_at += Duration::hours(1);
        let list = vec![
            expense("before", 100, date(2024, 12, 31)),
            expense("start", 200, date(2025, 1, 1)),
            expense("earlier entry", 300, date(2025, 1, 10)),
            same_day_later,
            expense("end", 400, date(2025, 1, 31)),
            expense("after", 500, date(2025, 2, 1)),
        ];
        let options = ExportOptions {
            start_date: Some(date(2025, 1, 1)),
            end_date: Some(date(2025, 1, 31)),
            currency: None,
        };

        let out = ExportService::to_csv(&list, &options, None).unwrap();
        let descriptions: Vec<String> = parse(&out).iter().map(|r| r[1].to_string()).collect();
        assert_eq!(descriptions, vec!["end", "later entry", "earlier entry", "start"]);
    }

    #[test]
    fn test_invalid_range() {
        let options = ExportOptions {
            start_date: Some(date(2025, 2, 1)),
            end_date: Some(date(2025, 1, 1)),
            currency: None,
        };
        assert!(matches!(
            ExportService::to_csv(&[], &options, None),
            Err(ExportError::InvalidRange(_, _))
        ));
    }

    #[test]
    fn test_converts_to_requested_currency() {
        let list = vec![expense("Dinner", 4000, date(2025, 1, 5))];
        let options = ExportOptions { currency: Some(Currency::Eur), ..Default::default() };

        let out = ExportService::to_csv(&list, &options, Some(&rates())).unwrap();
        let row = &parse(&out)[0];
        assert_eq!(&row[3], "40.00");
        assert_eq!(&row[4], "USD");
        assert_eq!(&row[5], "20.00");
        assert_eq!(&row[6], "EUR");
    }

    #[test]
    fn test_conversion_failure_falls_back() {
        let list = vec![
            expense("Dinner", 4000, date(2025, 1, 5)),
            expense("Lunch", 1500, date(2025, 1, 6)),
        ];
        let options = ExportOptions { currency: Some(Currency::Gbp), ..Default::default() };

        let out = ExportService::to_csv(&list, &options, Some(&rates())).unwrap();
        let records = parse(&out);
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][5], "15.00");
        assert_eq!(&records[0][6], "USD");
    }

    #[test]
    fn test_row_flags_and_original_amount() {
        let mut e = expense("Gym", 2500, date(2025, 1, 5));
        e.original_amount = Some(2000);
        e.original_currency = Some(Currency::Gbp);
        e.is_recurring = true;
        e.recurring_frequency = Some(Frequency::Monthly);
        e.tags = BTreeSet::from(["health".to_string(), "fitness".to_string()]);

        let out = ExportService::to_csv(&[e], &ExportOptions::default(), None).unwrap();
        let row = &parse(&out)[0];
        assert_eq!(&row[2], "Food");
        assert_eq!(&row[3], "20.00");
        assert_eq!(&row[4], "GBP");
        assert_eq!(&row[5], "25.00");
        assert_eq!(&row[6], "USD");
        assert_eq!(&row[7], "fitness;health");
        assert_eq!(&row[8], "yes");
        assert_eq!(&row[9], "monthly");
        assert_eq!(&row[10], "no");
        assert_eq!(&row[11], "2025-01-01T09:00:00+00:00");
    }
}
