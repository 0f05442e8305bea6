//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod budget;
pub mod ledger;
pub mod transaction;

pub use budget::{BudgetError, BudgetRepository, CreateBudgetInput};
pub use ledger::{next_entry_timestamp, LedgerStore, NewTransaction, TransactionChanges};
pub use transaction::{TransactionError, TransactionRepository};
