//! Ledger store: row-level access to transactions and budget history.
//!
//! Operations that take a `&DatabaseTransaction` run inside the caller's
//! atomic scope and never touch the cache. Operations that take only `&self`
//! are read paths outside any scope and go through the cache-aside layer.

use chrono::{Duration, SubsecRound, Utc};
use finly_core::ledger::TransactionType;
use finly_shared::types::{BudgetId, CategoryId, LedgerEntryId, TransactionId, UserId};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::cache::{CacheAside, CacheKey};
use crate::entities::{budgets, budgets_history, transactions};

/// Fields of a transaction row to insert.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Owner.
    pub user_id: UserId,
    /// Budget the movement is booked against.
    pub budget_id: BudgetId,
    /// Spending category.
    pub category_id: CategoryId,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// Deposit or withdrawal.
    pub transaction_type: TransactionType,
    /// Free-form note.
    pub note: String,
}

/// Partial update of a transaction row. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    /// New category.
    pub category_id: Option<CategoryId>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New type.
    pub transaction_type: Option<TransactionType>,
    /// New note.
    pub note: Option<String>,
}

impl TransactionChanges {
    /// True if no column would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.amount.is_none()
            && self.transaction_type.is_none()
            && self.note.is_none()
    }
}

/// Timestamp for a new ledger entry that keeps the budget's history strictly ordered.
///
/// Normally the current time truncated to microseconds. If the clock has not
/// moved past the latest entry, one microsecond after it.
#[must_use]
pub fn next_entry_timestamp(last: Option<&budgets_history::Model>) -> DateTimeWithTimeZone {
    let now: DateTimeWithTimeZone = Utc::now().trunc_subsecs(6).into();
    match last {
        Some(entry) if entry.created_at >= now => {
            (entry.created_at.with_timezone(&Utc) + Duration::microseconds(1)).into()
        }
        _ => now,
    }
}

/// Row-level access to the ledger tables.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    db: DatabaseConnection,
    cache: CacheAside,
}

impl LedgerStore {
    /// Creates a new ledger store.
    #[must_use]
    pub const fn new(db: DatabaseConnection, cache: CacheAside) -> Self {
        Self { db, cache }
    }

    /// The connection used for read paths and for opening atomic scopes.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The cache-aside layer shared by every read path.
    #[must_use]
    pub const fn cache(&self) -> &CacheAside {
        &self.cache
    }

    // ========================================================================
    // In-scope operations
    // ========================================================================

    /// Locks the budget row for the rest of the scope if `user_id` owns it.
    ///
    /// Concurrent writers against the same budget queue behind this lock, so
    /// the read of the latest entry that follows cannot go stale. SQLite has
    /// no row locks; its writers are already serialized per database.
    pub async fn lock_budget(
        &self,
        txn: &DatabaseTransaction,
        budget_id: BudgetId,
        user_id: UserId,
    ) -> Result<Option<budgets::Model>, DbErr> {
        let mut query = budgets::Entity::find_by_id(budget_id.into_inner())
            .filter(budgets::Column::UserId.eq(user_id.into_inner()));

        if matches!(
            txn.get_database_backend(),
            DbBackend::Postgres | DbBackend::MySql
        ) {
            query = query.lock_exclusive();
        }

        query.one(txn).await
    }

    /// Inserts a transaction row stamped with `created_at`.
    pub async fn insert_transaction(
        &self,
        txn: &DatabaseTransaction,
        input: &NewTransaction,
        created_at: DateTimeWithTimeZone,
    ) -> Result<transactions::Model, DbErr> {
        transactions::ActiveModel {
            id: Set(TransactionId::new().into_inner()),
            user_id: Set(input.user_id.into_inner()),
            budget_id: Set(input.budget_id.into_inner()),
            category_id: Set(input.category_id.into_inner()),
            amount: Set(input.amount),
            transaction_type: Set(input.transaction_type.as_str().to_string()),
            note: Set(input.note.clone()),
            created_at: Set(created_at),
        }
        .insert(txn)
        .await
    }

    /// Loads a transaction owned by `user_id`.
    pub async fn get_transaction(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
        user_id: UserId,
    ) -> Result<Option<transactions::Model>, DbErr> {
        find_owned_transaction(txn, transaction_id, user_id).await
    }

    /// Writes the changed columns. Returns the number of rows touched.
    pub async fn update_transaction_fields(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
        user_id: UserId,
        changes: &TransactionChanges,
    ) -> Result<u64, DbErr> {
        if changes.is_empty() {
            return Ok(0);
        }

        let mut model = <transactions::ActiveModel as Default>::default();
        if let Some(category_id) = changes.category_id {
            model.category_id = Set(category_id.into_inner());
        }
        if let Some(amount) = changes.amount {
            model.amount = Set(amount);
        }
        if let Some(transaction_type) = changes.transaction_type {
            model.transaction_type = Set(transaction_type.as_str().to_string());
        }
        if let Some(note) = &changes.note {
            model.note = Set(note.clone());
        }

        let result = transactions::Entity::update_many()
            .set(model)
            .filter(transactions::Column::Id.eq(transaction_id.into_inner()))
            .filter(transactions::Column::UserId.eq(user_id.into_inner()))
            .exec(txn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Deletes a transaction owned by `user_id`. Returns the number of rows removed.
    pub async fn delete_transaction(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
        user_id: UserId,
    ) -> Result<u64, DbErr> {
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(transaction_id.into_inner()))
            .filter(transactions::Column::UserId.eq(user_id.into_inner()))
            .exec(txn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Latest history entry of a budget, ordered by time then id.
    pub async fn get_last_ledger_entry<C: ConnectionTrait>(
        &self,
        conn: &C,
        budget_id: BudgetId,
    ) -> Result<Option<budgets_history::Model>, DbErr> {
        find_last_entry(conn, budget_id).await
    }

    /// History entries at or after `from` (strictly after when not `inclusive`), oldest first.
    pub async fn list_ledger_entries_from(
        &self,
        txn: &DatabaseTransaction,
        budget_id: BudgetId,
        from: DateTimeWithTimeZone,
        inclusive: bool,
    ) -> Result<Vec<budgets_history::Model>, DbErr> {
        let bound = if inclusive {
            budgets_history::Column::CreatedAt.gte(from)
        } else {
            budgets_history::Column::CreatedAt.gt(from)
        };

        budgets_history::Entity::find()
            .filter(budgets_history::Column::BudgetId.eq(budget_id.into_inner()))
            .filter(bound)
            .order_by_asc(budgets_history::Column::CreatedAt)
            .order_by_asc(budgets_history::Column::Id)
            .all(txn)
            .await
    }

    /// Appends a history entry.
    ///
    /// `transaction_id` is `None` only for the seed entry of a new budget.
    pub async fn insert_ledger_entry(
        &self,
        txn: &DatabaseTransaction,
        budget_id: BudgetId,
        transaction_id: Option<TransactionId>,
        balance: Decimal,
        created_at: DateTimeWithTimeZone,
    ) -> Result<budgets_history::Model, DbErr> {
        budgets_history::ActiveModel {
            id: Set(LedgerEntryId::new().into_inner()),
            budget_id: Set(budget_id.into_inner()),
            transaction_id: Set(transaction_id.map(TransactionId::into_inner)),
            balance: Set(balance),
            created_at: Set(created_at),
        }
        .insert(txn)
        .await
    }

    /// Overwrites the balance of the entry produced by `transaction_id`.
    /// Returns the number of rows touched.
    pub async fn update_ledger_entry_balance(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
        balance: Decimal,
    ) -> Result<u64, DbErr> {
        let result = budgets_history::Entity::update_many()
            .col_expr(budgets_history::Column::Balance, Expr::value(balance))
            .filter(budgets_history::Column::TransactionId.eq(transaction_id.into_inner()))
            .exec(txn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Removes the entry produced by `transaction_id`. Returns the number of rows removed.
    pub async fn delete_ledger_entry(
        &self,
        txn: &DatabaseTransaction,
        transaction_id: TransactionId,
    ) -> Result<u64, DbErr> {
        let result = budgets_history::Entity::delete_many()
            .filter(budgets_history::Column::TransactionId.eq(transaction_id.into_inner()))
            .exec(txn)
            .await?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Cached read paths
    // ========================================================================

    /// Latest history entry, cached.
    pub async fn last_entry(
        &self,
        budget_id: BudgetId,
    ) -> Result<Option<budgets_history::Model>, DbErr> {
        let key = CacheKey::LastLedgerEntry(budget_id);
        self.cache
            .get_or_fetch(&key, self.cache.ttl_for(&key), || {
                find_last_entry(&self.db, budget_id)
            })
            .await
    }

    /// Full history of a budget, oldest first, cached.
    pub async fn ledger(&self, budget_id: BudgetId) -> Result<Vec<budgets_history::Model>, DbErr> {
        let key = CacheKey::LedgerList(budget_id);
        self.cache
            .get_or_fetch(&key, self.cache.ttl_for(&key), || {
                budgets_history::Entity::find()
                    .filter(budgets_history::Column::BudgetId.eq(budget_id.into_inner()))
                    .order_by_asc(budgets_history::Column::CreatedAt)
                    .order_by_asc(budgets_history::Column::Id)
                    .all(&self.db)
            })
            .await
    }

    /// Balance of the latest entry, or zero for an empty history, cached.
    pub async fn current_balance(&self, budget_id: BudgetId) -> Result<Decimal, DbErr> {
        let key = CacheKey::CurrentBalance(budget_id);
        self.cache
            .get_or_fetch(&key, self.cache.ttl_for(&key), || async {
                let last = find_last_entry(&self.db, budget_id).await?;
                Ok::<_, DbErr>(last.map_or(Decimal::ZERO, |entry| entry.balance))
            })
            .await
    }

    /// Every transaction owned by `user_id`, newest first, cached.
    pub async fn transactions_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<transactions::Model>, DbErr> {
        let key = CacheKey::TransactionsByUser(user_id);
        self.cache
            .get_or_fetch(&key, self.cache.ttl_for(&key), || {
                transactions::Entity::find()
                    .filter(transactions::Column::UserId.eq(user_id.into_inner()))
                    .order_by_desc(transactions::Column::CreatedAt)
                    .order_by_desc(transactions::Column::Id)
                    .all(&self.db)
            })
            .await
    }

    /// One transaction owned by `user_id`, cached.
    pub async fn transaction(
        &self,
        transaction_id: TransactionId,
        user_id: UserId,
    ) -> Result<Option<transactions::Model>, DbErr> {
        let key = CacheKey::Transaction {
            transaction_id,
            user_id,
        };
        self.cache
            .get_or_fetch(&key, self.cache.ttl_for(&key), || {
                find_owned_transaction(&self.db, transaction_id, user_id)
            })
            .await
    }
}

async fn find_last_entry<C: ConnectionTrait>(
    conn: &C,
    budget_id: BudgetId,
) -> Result<Option<budgets_history::Model>, DbErr> {
    budgets_history::Entity::find()
        .filter(budgets_history::Column::BudgetId.eq(budget_id.into_inner()))
        .order_by_desc(budgets_history::Column::CreatedAt)
        .order_by_desc(budgets_history::Column::Id)
        .one(conn)
        .await
}

async fn find_owned_transaction<C: ConnectionTrait>(
    conn: &C,
    transaction_id: TransactionId,
    user_id: UserId,
) -> Result<Option<transactions::Model>, DbErr> {
    transactions::Entity::find_by_id(transaction_id.into_inner())
        .filter(transactions::Column::UserId.eq(user_id.into_inner()))
        .one(conn)
        .await
}
