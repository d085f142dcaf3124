use crate::models::{Expense, Frequency};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use uuid::Uuid;

/// The `n`th occurrence of a series starting at `start` (`n = 0` is `start` itself).
///
/// Monthly series step in calendar months from the original date, so a
/// series started on the 31st lands on the last day of shorter months
/// and returns to the 31st afterwards.
pub fn occurrence(start: NaiveDate, frequency: Frequency, n: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Weekly => start.checked_add_signed(Duration::days(7 * i64::from(n))),
        Frequency::Monthly => start.checked_add_months(Months::new(n)),
    }
}

fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let months = |d: NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
    months(end) - months(start)
}

pub fn is_due(expense: &Expense, today: NaiveDate) -> bool {
    if !expense.is_recurring {
        return false;
    }
    let Some(frequency) = expense.recurring_frequency else {
        return false;
    };
    if today < expense.date {
        return false;
    }

    match frequency {
        Frequency::Weekly => (today - expense.date).num_days() % 7 == 0,
        Frequency::Monthly => {
            let n = months_between(expense.date, today);
            u32::try_from(n)
                .ok()
                .and_then(|n| occurrence(expense.date, frequency, n))
                == Some(today)
        }
    }
}

/// First occurrence after the series start that falls on or after `today`.
pub fn next_due_date(expense: &Expense, today: NaiveDate) -> Option<NaiveDate> {
    let frequency = expense.recurring_frequency?;

    let mut n: u32 = match frequency {
        Frequency::Weekly => {
            let days = (today - expense.date).num_days();
            u32::try_from((days + 6).div_euclid(7)).unwrap_or(0)
        }
        Frequency::Monthly => u32::try_from(months_between(expense.date, today)).unwrap_or(0),
    }
    .max(1);

    loop {
        let date = occurrence(expense.date, frequency, n)?;
        if date >= today {
            return Some(date);
        }
        n += 1;
    }
}

/// Materialise the next instance of a recurring expense.
///
/// The copy points back at its template through `recurring_parent_id` and
/// is not itself recurring. Receipts stay with the template.
pub fn generate_next(expense: &Expense, today: NaiveDate, now: DateTime<Utc>) -> Option<Expense> {
    if !expense.is_recurring {
        return None;
    }
    let date = next_due_date(expense, today)?;

    Some(Expense {
        id: Uuid::new_v4(),
        date,
        is_recurring: false,
        recurring_frequency: None,
        recurring_parent_id: Some(expense.id),
        receipt: None,
        created_at: now,
        updated_at: now,
        ..expense.clone()
    })
}
