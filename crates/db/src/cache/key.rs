//! Cache keys and their time-to-live policy.

use std::fmt;
use std::time::Duration;

use finly_shared::config::CacheConfig;
use finly_shared::types::{BudgetId, TransactionId, UserId};

/// A cached query shape, parameterized by the entity it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Latest history entry of a budget.
    LastLedgerEntry(BudgetId),
    /// Full history of a budget.
    LedgerList(BudgetId),
    /// Current balance of a budget.
    CurrentBalance(BudgetId),
    /// Every transaction owned by a user.
    TransactionsByUser(UserId),
    /// One transaction, scoped to its owner.
    Transaction {
        /// The transaction.
        transaction_id: TransactionId,
        /// Its owner.
        user_id: UserId,
    },
    /// The budget owned by a user.
    BudgetByUser(UserId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastLedgerEntry(budget) => write!(f, "budget:history:last:{budget}"),
            Self::LedgerList(budget) => write!(f, "budget:history:list:{budget}"),
            Self::CurrentBalance(budget) => write!(f, "budget:balance:{budget}"),
            Self::TransactionsByUser(user) => write!(f, "transactions:user:{user}"),
            Self::Transaction {
                transaction_id,
                user_id,
            } => write!(f, "transaction:{transaction_id}:user:{user_id}"),
            Self::BudgetByUser(user) => write!(f, "budget:user:{user}"),
        }
    }
}

impl CacheKey {
    /// Keys whose payload depends on a budget's history.
    #[must_use]
    pub const fn budget_ledger(budget_id: BudgetId) -> [Self; 3] {
        [
            Self::LastLedgerEntry(budget_id),
            Self::LedgerList(budget_id),
            Self::CurrentBalance(budget_id),
        ]
    }

    /// Keys made stale by creating, editing, or deleting one transaction.
    #[must_use]
    pub fn ledger_mutation(
        budget_id: BudgetId,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Vec<Self> {
        let mut keys = Self::budget_ledger(budget_id).to_vec();
        keys.push(Self::TransactionsByUser(user_id));
        keys.push(Self::Transaction {
            transaction_id,
            user_id,
        });
        keys
    }
}

/// Time-to-live per query shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// [`CacheKey::LastLedgerEntry`].
    pub last_entry: Duration,
    /// [`CacheKey::LedgerList`].
    pub ledger_list: Duration,
    /// [`CacheKey::CurrentBalance`].
    pub current_balance: Duration,
    /// [`CacheKey::TransactionsByUser`].
    pub transactions_list: Duration,
    /// [`CacheKey::Transaction`].
    pub transaction: Duration,
    /// [`CacheKey::BudgetByUser`].
    pub budget: Duration,
}

impl CacheTtls {
    /// TTL that applies to `key`.
    #[must_use]
    pub const fn for_key(&self, key: &CacheKey) -> Duration {
        match key {
            CacheKey::LastLedgerEntry(_) => self.last_entry,
            CacheKey::LedgerList(_) => self.ledger_list,
            CacheKey::CurrentBalance(_) => self.current_balance,
            CacheKey::TransactionsByUser(_) => self.transactions_list,
            CacheKey::Transaction { .. } => self.transaction,
            CacheKey::BudgetByUser(_) => self.budget,
        }
    }
}

impl From<&CacheConfig> for CacheTtls {
    fn from(config: &CacheConfig) -> Self {
        Self {
            last_entry: Duration::from_secs(config.last_entry_ttl_secs),
            ledger_list: Duration::from_secs(config.ledger_list_ttl_secs),
            current_balance: Duration::from_secs(config.current_balance_ttl_secs),
            transactions_list: Duration::from_secs(config.transactions_list_ttl_secs),
            transaction: Duration::from_secs(config.transaction_ttl_secs),
            budget: Duration::from_secs(config.budget_ttl_secs),
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}
