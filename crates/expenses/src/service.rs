use crate::models::{Expense, ExpenseForm, ExpenseUpdate, NewExpense};
use crate::recurring;
use crate::repository::ExpenseRepository;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::Clock;
use currency::{convert, Currency, CurrencyError, RateTable};
use database::{KeyValueStore, RepositoryError};
use receipts::{ReceiptError, ReceiptService, ReceiptUpload};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("Invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Expense not found")]
    NotFound,
    #[error("Could not save expenses: {0}")]
    Storage(String),
    #[error(transparent)]
    Currency(#[from] CurrencyError),
    #[error(transparent)]
    Receipt(#[from] ReceiptError),
}

impl From<RepositoryError> for ExpenseError {
    fn from(err: RepositoryError) -> Self {
        ExpenseError::Storage(err.to_string())
    }
}

/// Owns the in-memory expense collection and writes it through to the store.
///
/// Every mutation is persisted before it becomes visible: if the write
/// fails, the in-memory collection is left untouched.
pub struct ExpenseService<S: KeyValueStore> {
    store: S,
    clock: Arc<dyn Clock>,
    display_currency: Currency,
    expenses: Vec<Expense>,
    last_error: Option<String>,
}

impl<S: KeyValueStore> ExpenseService<S> {
    /// Reads the persisted collection; an unreadable store starts empty.
    #[instrument(skip(store, clock))]
    pub async fn load(store: S, clock: Arc<dyn Clock>, display_currency: Currency) -> Self {
        let expenses = ExpenseRepository::new(&store).load().await.unwrap_or_else(|e| {
            tracing::warn!("Could not load expenses, starting empty: {}", e);
            Vec::new()
        });
        tracing::info!("Loaded {} expenses", expenses.len());

        Self {
            store,
            clock,
            display_currency,
            expenses,
            last_error: None,
        }
    }

    pub fn display_currency(&self) -> Currency {
        self.display_currency
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Records in insertion order.
    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn get(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    /// Newest date first; same-day records newest-entered first.
    pub fn list(&self) -> Vec<Expense> {
        let mut list = self.expenses.clone();
        sort_newest_first(&mut list);
        list
    }

    pub fn total(&self) -> i64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    #[instrument(skip(self, rates))]
    pub async fn add(&mut self, form: &ExpenseForm, rates: Option<&RateTable>) -> Result<Expense, ExpenseError> {
        let result = self.try_add(form, rates).await;
        self.track(result)
    }

    #[instrument(skip(self, rates))]
    pub async fn update(
        &mut self,
        id: Uuid,
        changes: &ExpenseUpdate,
        rates: Option<&RateTable>,
    ) -> Result<Expense, ExpenseError> {
        let result = self.try_update(id, changes, rates).await;
        self.track(result)
    }

    /// Fails with `NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: Uuid) -> Result<(), ExpenseError> {
        let result = self.try_delete(id).await;
        self.track(result)
    }

    /// Stores the image and links it, replacing any previous receipt.
    #[instrument(skip(self, upload), fields(file = %upload.file_name))]
    pub async fn attach_receipt(&mut self, id: Uuid, upload: &ReceiptUpload) -> Result<Expense, ExpenseError> {
        let result = self.try_attach_receipt(id, upload).await;
        self.track(result)
    }

    /// Materialises every recurring instance due on `today` that does not exist yet.
    ///
    /// (template id, due date) identifies an instance, so calling this
    /// repeatedly on the same day never duplicates anything.
    #[instrument(skip(self))]
    pub async fn generate_recurring(&mut self, today: NaiveDate) -> Result<Vec<Expense>, ExpenseError> {
        let result = self.try_generate_recurring(today).await;
        self.track(result)
    }

    fn track<T>(&mut self, result: Result<T, ExpenseError>) -> Result<T, ExpenseError> {
        if let Err(e) = &result {
            tracing::error!("Expense operation failed: {}", e);
            self.last_error = Some(e.to_string());
        }
        result
    }

    async fn persist(&mut self, next: Vec<Expense>) -> Result<(), ExpenseError> {
        ExpenseRepository::new(&self.store).save(&next).await?;
        self.expenses = next;
        Ok(())
    }

    fn fresh_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if self.get(id).is_none() {
                return id;
            }
        }
    }

    // updated_at must move forward even if the clock did not.
    fn touch(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        let now = self.clock.now();
        if now > previous {
            now
        } else {
            previous + Duration::milliseconds(1)
        }
    }

    /// (amount, currency, original amount, original currency) in display terms.
    fn to_display(
        &self,
        new: &NewExpense,
        rates: Option<&RateTable>,
    ) -> Result<(i64, Currency, Option<i64>, Option<Currency>), ExpenseError> {
        match new.currency() {
            Some(entered) if entered != self.display_currency => {
                let rates = rates.ok_or(CurrencyError::MissingRate(entered))?;
                let converted = convert(new.amount(), entered, self.display_currency, rates)?;
                if converted < 1 {
                    return Err(ExpenseError::Validation(vec![
                        "Amount is too small after currency conversion".to_string(),
                    ]));
                }
                Ok((converted, self.display_currency, Some(new.amount()), Some(entered)))
            }
            _ => Ok((new.amount(), self.display_currency, None, None)),
        }
    }

    async fn try_add(&mut self, form: &ExpenseForm, rates: Option<&RateTable>) -> Result<Expense, ExpenseError> {
        let new = NewExpense::new(form, self.clock.today()).map_err(ExpenseError::Validation)?;
        let (amount, currency, original_amount, original_currency) = self.to_display(&new, rates)?;
        let now = self.clock.now();

        let expense = Expense {
            id: self.fresh_id(),
            amount,
            currency,
            original_amount,
            original_currency,
            category: new.category(),
            date: new.date(),
            description: new.description().to_string(),
            tags: new.tags().clone(),
            is_recurring: new.is_recurring(),
            recurring_frequency: new.recurring_frequency(),
            recurring_parent_id: None,
            receipt: None,
            created_at: now,
            updated_at: now,
        };

        let mut next = self.expenses.clone();
        next.push(expense.clone());
        self.persist(next).await?;

        tracing::info!("Added expense {} ({})", expense.id, expense.amount);
        Ok(expense)
    }

    async fn try_update(
        &mut self,
        id: Uuid,
        changes: &ExpenseUpdate,
        rates: Option<&RateTable>,
    ) -> Result<Expense, ExpenseError> {
        let index = self.position(id)?;
        let existing = &self.expenses[index];

        let form = changes.merge(existing);
        let new = NewExpense::new(&form, self.clock.today()).map_err(ExpenseError::Validation)?;
        // Untouched money fields keep the conversion made when they were entered.
        let (amount, currency, original_amount, original_currency) = if changes.changes_money() {
            self.to_display(&new, rates)?
        } else {
            (existing.amount, existing.currency, existing.original_amount, existing.original_currency)
        };

        let updated = Expense {
            id: existing.id,
            amount,
            currency,
            original_amount,
            original_currency,
            category: new.category(),
            date: new.date(),
            description: new.description().to_string(),
            tags: new.tags().clone(),
            is_recurring: new.is_recurring(),
            recurring_frequency: new.recurring_frequency(),
            recurring_parent_id: existing.recurring_parent_id,
            receipt: existing.receipt,
            created_at: existing.created_at,
            updated_at: self.touch(existing.updated_at),
        };

        let mut next = self.expenses.clone();
        next[index] = updated.clone();
        self.persist(next).await?;

        Ok(updated)
    }

    async fn try_delete(&mut self, id: Uuid) -> Result<(), ExpenseError> {
        let index = self.position(id)?;

        let mut next = self.expenses.clone();
        let removed = next.remove(index);
        self.persist(next).await?;

        if let Some(receipt) = removed.receipt {
            if let Err(e) = ReceiptService::delete(&self.store, &receipt).await {
                tracing::warn!("Expense {} deleted but receipt {} was not: {}", id, receipt, e);
            }
        }
        Ok(())
    }

    async fn try_attach_receipt(&mut self, id: Uuid, upload: &ReceiptUpload) -> Result<Expense, ExpenseError> {
        let index = self.position(id)?;
        let receipt = ReceiptService::upload(&self.store, upload, self.clock.now()).await?;

        let mut next = self.expenses.clone();
        let previous = next[index].receipt.replace(receipt);
        next[index].updated_at = self.touch(next[index].updated_at);
        let updated = next[index].clone();

        if let Err(e) = self.persist(next).await {
            // Roll back the orphaned upload.
            if let Err(cleanup) = ReceiptService::delete(&self.store, &receipt).await {
                tracing::warn!("Could not remove orphaned receipt {}: {}", receipt, cleanup);
            }
            return Err(e);
        }

        if let Some(previous) = previous {
            if let Err(e) = ReceiptService::delete(&self.store, &previous).await {
                tracing::warn!("Could not remove replaced receipt {}: {}", previous, e);
            }
        }
        Ok(updated)
    }

    async fn try_generate_recurring(&mut self, today: NaiveDate) -> Result<Vec<Expense>, ExpenseError> {
        let now = self.clock.now();

        let created: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|e| e.recurring_parent_id.is_none() && e.date != today)
            .filter(|e| recurring::is_due(e, today))
            .filter(|template| {
                !self
                    .expenses
                    .iter()
                    .any(|e| e.recurring_parent_id == Some(template.id) && e.date == today)
            })
            .filter_map(|template| recurring::generate_next(template, today, now))
            .collect();

        if created.is_empty() {
            return Ok(created);
        }

        let mut next = self.expenses.clone();
        next.extend(created.iter().cloned());
        self.persist(next).await?;

        tracing::info!("Generated {} recurring expenses", created.len());
        Ok(created)
    }

    fn position(&self, id: Uuid) -> Result<usize, ExpenseError> {
        self.expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or(ExpenseError::NotFound)
    }
}

pub fn sort_newest_first(expenses: &mut [Expense]) {
    expenses.sort_by_key(|e| (Reverse(e.date), Reverse(e.created_at)));
}
