//! Transaction repository: keeps transactions and budget history consistent.
//!
//! Every mutation runs in one database transaction that first locks the
//! owning budget row, then reads, validates, and writes. Either every row
//! changes or none does. Cache keys touched by a mutation are invalidated
//! only after commit, and cache failures never fail the mutation.

use finly_core::ledger::{
    apply_delta_sequence, delta, invert_delta, project_new_balance, validate_amount, LedgerError,
    TransactionType,
};
use finly_shared::types::{BudgetId, TransactionId, UserId};
use finly_shared::{AppError, ErrorKind};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, DbErr, TransactionTrait};
use tracing::{info, warn};
use uuid::Uuid;

use super::ledger::{next_entry_timestamp, LedgerStore, NewTransaction, TransactionChanges};
use crate::cache::CacheKey;
use crate::entities::{budgets_history, transactions};

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Transaction not found for this user.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// Budget not found for this user.
    #[error("Budget not found: {0}")]
    BudgetNotFound(BudgetId),

    /// Balance rule violation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A transaction has no history entry.
    #[error("Ledger entry missing for transaction {0}")]
    MissingLedgerEntry(TransactionId),

    /// A seed entry sorts after a transaction entry of the same budget.
    #[error("Ledger entry {0} has no transaction but follows one")]
    OrphanLedgerEntry(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl TransactionError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::BudgetNotFound(_) => ErrorKind::NotFound,
            Self::Ledger(e) => e.kind(),
            Self::MissingLedgerEntry(_) | Self::OrphanLedgerEntry(_) | Self::Database(_) => {
                ErrorKind::Storage
            }
        }
    }
}

impl From<TransactionError> for AppError {
    fn from(err: TransactionError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

/// Coordinates transaction mutations with their ledger effects.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    store: LedgerStore,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Records a movement and appends the resulting balance to the budget's history.
    ///
    /// # Errors
    ///
    /// - `Ledger(NonPositiveAmount)` or `Ledger(AmountOutOfRange)` before anything is opened
    /// - `BudgetNotFound` if the caller does not own the budget
    /// - `Ledger(InsufficientBalance)` for an overdrawing withdrawal
    /// - `Database` for storage failures
    pub async fn create(&self, input: NewTransaction) -> Result<TransactionId, TransactionError> {
        validate_amount(input.amount)?;

        let txn = self.store.connection().begin().await?;
        let outcome = self.create_in_scope(&txn, &input).await;
        let transaction_id = finish(txn, outcome).await?;

        info!(
            transaction_id = %transaction_id,
            budget_id = %input.budget_id,
            transaction_type = %input.transaction_type,
            amount = %input.amount,
            "Transaction created"
        );

        self.store
            .cache()
            .invalidate(&CacheKey::ledger_mutation(
                input.budget_id,
                input.user_id,
                transaction_id,
            ))
            .await;

        Ok(transaction_id)
    }

    async fn create_in_scope(
        &self,
        txn: &DatabaseTransaction,
        input: &NewTransaction,
    ) -> Result<TransactionId, TransactionError> {
        self.store
            .lock_budget(txn, input.budget_id, input.user_id)
            .await?
            .ok_or(TransactionError::BudgetNotFound(input.budget_id))?;

        let last = self.store.get_last_ledger_entry(txn, input.budget_id).await?;
        let created_at = next_entry_timestamp(last.as_ref());

        let transaction = self.store.insert_transaction(txn, input, created_at).await?;
        let transaction_id = TransactionId::from_uuid(transaction.id);

        let new_balance = project_new_balance(
            last.map(|entry| entry.balance),
            input.amount,
            input.transaction_type,
        )?;

        self.store
            .insert_ledger_entry(txn, input.budget_id, Some(transaction_id), new_balance, created_at)
            .await?;

        Ok(transaction_id)
    }

    /// Applies a partial edit and shifts every balance from the edited entry onward.
    ///
    /// Edits that leave type and amount unchanged never touch the history.
    ///
    /// # Errors
    ///
    /// - `Ledger(NonPositiveAmount)` or `Ledger(AmountOutOfRange)` before anything is opened
    /// - `NotFound` if the caller does not own the transaction
    /// - `Ledger(InsufficientBalance)` if any shifted balance would go negative
    /// - `Database` for storage failures
    pub async fn update(
        &self,
        transaction_id: TransactionId,
        user_id: UserId,
        changes: TransactionChanges,
    ) -> Result<(), TransactionError> {
        if let Some(amount) = changes.amount {
            validate_amount(amount)?;
        }

        let txn = self.store.connection().begin().await?;
        let outcome = self
            .update_in_scope(&txn, transaction_id, user_id, &changes)
            .await;
        let budget_id = finish(txn, outcome).await?;

        info!(
            transaction_id = %transaction_id,
            budget_id = %budget_id,
            "Transaction updated"
        );

        self.store
            .cache()
            .invalidate(&CacheKey::ledger_mutation(budget_id, user_id, transaction_id))
            .await;

        Ok(())
    }

    async fn update_in_scope(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
        user_id: UserId,
        changes: &TransactionChanges,
    ) -> Result<BudgetId, TransactionError> {
        let existing = self.lock_for_mutation(txn, transaction_id, user_id).await?;
        let budget_id = BudgetId::from_uuid(existing.budget_id);

        let old_type: TransactionType = existing.transaction_type.parse()?;
        let new_type = changes.transaction_type.unwrap_or(old_type);
        let new_amount = changes.amount.unwrap_or(existing.amount);

        self.store
            .update_transaction_fields(txn, transaction_id, user_id, changes)
            .await?;

        if new_type == old_type && new_amount == existing.amount {
            return Ok(budget_id);
        }

        let shift = delta(old_type, existing.amount, new_type, new_amount)?;
        let from_edited = self
            .store
            .list_ledger_entries_from(txn, budget_id, existing.created_at, true)
            .await?;
        self.rewrite_balances(txn, &from_edited, shift).await?;

        Ok(budget_id)
    }

    /// Removes a transaction and its history entry, shifting every later balance.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the caller does not own the transaction
    /// - `Ledger(InsufficientBalance)` if removing it would drive a later balance negative
    /// - `Database` for storage failures
    pub async fn delete(
        &self,
        transaction_id: TransactionId,
        user_id: UserId,
    ) -> Result<(), TransactionError> {
        let txn = self.store.connection().begin().await?;
        let outcome = self.delete_in_scope(&txn, transaction_id, user_id).await;
        let budget_id = finish(txn, outcome).await?;

        info!(
            transaction_id = %transaction_id,
            budget_id = %budget_id,
            "Transaction deleted"
        );

        self.store
            .cache()
            .invalidate(&CacheKey::ledger_mutation(budget_id, user_id, transaction_id))
            .await;

        Ok(())
    }

    async fn delete_in_scope(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
        user_id: UserId,
    ) -> Result<BudgetId, TransactionError> {
        let existing = self.lock_for_mutation(txn, transaction_id, user_id).await?;
        let budget_id = BudgetId::from_uuid(existing.budget_id);

        let kind: TransactionType = existing.transaction_type.parse()?;
        let shift = invert_delta(kind, existing.amount);
        let later = self
            .store
            .list_ledger_entries_from(txn, budget_id, existing.created_at, false)
            .await?;
        self.rewrite_balances(txn, &later, shift).await?;

        if self.store.delete_ledger_entry(txn, transaction_id).await? == 0 {
            return Err(TransactionError::MissingLedgerEntry(transaction_id));
        }
        if self
            .store
            .delete_transaction(txn, transaction_id, user_id)
            .await?
            == 0
        {
            return Err(TransactionError::NotFound(transaction_id));
        }

        Ok(budget_id)
    }

    /// Finds the transaction, locks its budget, and re-reads it under the lock.
    ///
    /// The budget a transaction belongs to never changes, so the first read is
    /// only used to find which row to lock.
    async fn lock_for_mutation(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
        user_id: UserId,
    ) -> Result<transactions::Model, TransactionError> {
        let located = self
            .store
            .get_transaction(txn, transaction_id, user_id)
            .await?
            .ok_or(TransactionError::NotFound(transaction_id))?;
        let budget_id = BudgetId::from_uuid(located.budget_id);

        self.store
            .lock_budget(txn, budget_id, user_id)
            .await?
            .ok_or(TransactionError::BudgetNotFound(budget_id))?;

        self.store
            .get_transaction(txn, transaction_id, user_id)
            .await?
            .ok_or(TransactionError::NotFound(transaction_id))
    }

    /// Shifts every entry by `shift`, checking all of them before writing any.
    async fn rewrite_balances(
        &self,
        txn: &DatabaseTransaction,
        entries: &[budgets_history::Model],
        shift: Decimal,
    ) -> Result<(), TransactionError> {
        if shift.is_zero() || entries.is_empty() {
            return Ok(());
        }

        let planned = apply_delta_sequence(entries, shift)?
            .into_iter()
            .map(|update| {
                update
                    .entry
                    .transaction_id
                    .map(|id| (TransactionId::from_uuid(id), update.balance))
                    .ok_or(TransactionError::OrphanLedgerEntry(update.entry.id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (owner, balance) in planned {
            if self
                .store
                .update_ledger_entry_balance(txn, owner, balance)
                .await?
                == 0
            {
                return Err(TransactionError::MissingLedgerEntry(owner));
            }
        }

        Ok(())
    }

    /// Transactions owned by `user_id`, newest first.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<transactions::Model>, TransactionError> {
        Ok(self.store.transactions_by_user(user_id).await?)
    }

    /// One transaction owned by `user_id`.
    pub async fn find(
        &self,
        transaction_id: TransactionId,
        user_id: UserId,
    ) -> Result<transactions::Model, TransactionError> {
        self.store
            .transaction(transaction_id, user_id)
            .await?
            .ok_or(TransactionError::NotFound(transaction_id))
    }
}

/// Commits on success. On failure rolls back and returns the original error.
async fn finish<T>(
    txn: DatabaseTransaction,
    outcome: Result<T, TransactionError>,
) -> Result<T, TransactionError> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "Rollback failed, connection drop will discard the scope");
            }
            Err(err)
        }
    }
}
