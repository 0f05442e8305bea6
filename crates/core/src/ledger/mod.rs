//! Budget ledger arithmetic.
//!
//! A budget's history is a time-ordered list of running balances. Each
//! deposit or withdrawal appends one entry; edits and deletions shift every
//! later entry by a signed delta. This module holds the pure part of that:
//! - Transaction types and signed amounts
//! - Projection of a new balance from the prior one
//! - Delta computation and all-or-nothing propagation
//! - Full replay from a seed balance

pub mod balance;
pub mod error;
pub mod types;

#[cfg(test)]
mod balance_props;

pub use balance::{
    apply_delta_sequence, delta, invert_delta, project_new_balance, replay_balances,
    signed_amount, validate_amount, validate_seed, BalanceUpdate, Balanced, AMOUNT_LIMIT, MAX_SCALE,
};
pub use error::LedgerError;
pub use types::TransactionType;
