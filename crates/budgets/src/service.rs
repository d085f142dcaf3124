use crate::models::{Budget, SetBudgetRequest};
use crate::repository::BudgetRepository;
use chrono::NaiveDate;
use database::{KeyValueStore, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Could not save budget: {0}")]
    Storage(String),
}

impl From<RepositoryError> for BudgetError {
    fn from(err: RepositoryError) -> Self {
        BudgetError::Storage(err.to_string())
    }
}

pub struct BudgetService;

impl BudgetService {
    #[instrument(skip(store))]
    pub async fn set_budget<S: KeyValueStore>(
        store: &S,
        limit_dollars: f64,
        today: NaiveDate,
    ) -> Result<Budget, BudgetError> {
        let budget = SetBudgetRequest::new(limit_dollars, today)
            .map_err(BudgetError::InvalidInput)?
            .into_budget();

        let repo = BudgetRepository::new(store);
        repo.put(&budget).await.map_err(|e| {
            tracing::error!("Failed to save budget: {}", e);
            BudgetError::from(e)
        })?;

        Ok(budget)
    }

    /// The budget for the month containing `today`.
    ///
    /// A budget left over from an earlier month carries its limit forward.
    /// If that write fails the rolled budget is still returned.
    #[instrument(skip(store))]
    pub async fn current_budget<S: KeyValueStore>(
        store: &S,
        today: NaiveDate,
    ) -> Result<Option<Budget>, BudgetError> {
        let repo = BudgetRepository::new(store);
        let Some(budget) = repo.get().await? else {
            return Ok(None);
        };

        if budget.is_for(today) {
            return Ok(Some(budget));
        }

        let rolled = budget.rolled_to(today);
        tracing::info!("Carrying budget from {} to {}", budget.current_month, rolled.current_month);
        if let Err(e) = repo.put(&rolled).await {
            tracing::warn!("Auto-copy budget failed: {}. Continuing anyway.", e);
        }
        Ok(Some(rolled))
    }
}
