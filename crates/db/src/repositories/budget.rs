//! Budget repository: opening budgets and reading their history.

use finly_core::ledger::{validate_seed, LedgerError};
use finly_shared::types::{BudgetId, UserId};
use finly_shared::{AppError, ErrorKind};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr, TransactionTrait,
};
use tracing::{info, warn};

use super::ledger::{next_entry_timestamp, LedgerStore};
use crate::cache::CacheKey;
use crate::entities::{budgets, budgets_history};

/// Error types for budget operations.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// The user has no budget.
    #[error("No budget for user {0}")]
    NotFound(UserId),

    /// The user already has a budget.
    #[error("User {0} already has a budget")]
    AlreadyExists(UserId),

    /// Currency is not a three-letter code.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// Balance rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl BudgetError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) | Self::InvalidCurrency(_) => ErrorKind::InvalidInput,
            Self::Ledger(e) => e.kind(),
            Self::Database(_) => ErrorKind::Storage,
        }
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

/// Input for opening a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    /// Owner. A user has at most one budget.
    pub user_id: UserId,
    /// ISO 4217 code, e.g. `USD`.
    pub currency: String,
    /// Opening balance. Zero opens the budget with an empty history.
    pub initial_amount: Decimal,
}

/// Budget repository.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    store: LedgerStore,
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Opens a budget, seeding its history with the opening balance when non-zero.
    ///
    /// # Errors
    ///
    /// - `Ledger(NegativeSeed)` for a negative opening balance
    /// - `InvalidCurrency` for a malformed currency code
    /// - `AlreadyExists` if the user already owns a budget
    /// - `Database` for storage failures
    pub async fn create(&self, input: CreateBudgetInput) -> Result<budgets::Model, BudgetError> {
        validate_seed(input.initial_amount)?;
        let currency = normalize_currency(&input.currency)?;

        let txn = self.store.connection().begin().await?;
        let budget = match self.create_in_scope(&txn, &input, currency).await {
            Ok(budget) => budget,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                return Err(err);
            }
        };
        txn.commit().await?;

        info!(
            budget_id = %budget.id,
            user_id = %input.user_id,
            initial_amount = %input.initial_amount,
            "Budget created"
        );

        let budget_id = BudgetId::from_uuid(budget.id);
        let mut stale = CacheKey::budget_ledger(budget_id).to_vec();
        stale.push(CacheKey::BudgetByUser(input.user_id));
        self.store.cache().invalidate(&stale).await;

        Ok(budget)
    }

    async fn create_in_scope(
        &self,
        txn: &DatabaseTransaction,
        input: &CreateBudgetInput,
        currency: String,
    ) -> Result<budgets::Model, BudgetError> {
        let existing = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(input.user_id.into_inner()))
            .one(txn)
            .await?;
        if existing.is_some() {
            return Err(BudgetError::AlreadyExists(input.user_id));
        }

        let created_at = next_entry_timestamp(None);
        let budget = budgets::ActiveModel {
            id: Set(BudgetId::new().into_inner()),
            user_id: Set(input.user_id.into_inner()),
            currency: Set(currency),
            created_at: Set(created_at),
            updated_at: Set(created_at),
        }
        .insert(txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => BudgetError::AlreadyExists(input.user_id),
            _ => BudgetError::Database(e),
        })?;

        if !input.initial_amount.is_zero() {
            self.store
                .insert_ledger_entry(
                    txn,
                    BudgetId::from_uuid(budget.id),
                    None,
                    input.initial_amount,
                    created_at,
                )
                .await?;
        }

        Ok(budget)
    }

    /// The budget owned by `user_id`, cached.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<budgets::Model, BudgetError> {
        let key = CacheKey::BudgetByUser(user_id);
        let cache = self.store.cache();
        let budget = cache
            .get_or_fetch(&key, cache.ttl_for(&key), || {
                budgets::Entity::find()
                    .filter(budgets::Column::UserId.eq(user_id.into_inner()))
                    .one(self.store.connection())
            })
            .await?;

        budget.ok_or(BudgetError::NotFound(user_id))
    }

    /// Full history of a budget, oldest first.
    pub async fn history(
        &self,
        budget_id: BudgetId,
    ) -> Result<Vec<budgets_history::Model>, BudgetError> {
        Ok(self.store.ledger(budget_id).await?)
    }

    /// Current balance of a budget; zero when it has no history.
    pub async fn current_balance(&self, budget_id: BudgetId) -> Result<Decimal, BudgetError> {
        Ok(self.store.current_balance(budget_id).await?)
    }

    /// Latest history entry of a budget.
    pub async fn last_entry(
        &self,
        budget_id: BudgetId,
    ) -> Result<Option<budgets_history::Model>, BudgetError> {
        Ok(self.store.last_entry(budget_id).await?)
    }
}

fn normalize_currency(raw: &str) -> Result<String, BudgetError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(code)
    } else {
        Err(BudgetError::InvalidCurrency(raw.to_string()))
    }
}
