//! Ledger error types.

use finly_shared::ErrorKind;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by balance arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transaction type is neither deposit nor withdrawal.
    #[error("Invalid transaction type: {0:?}")]
    InvalidTransactionType(String),

    /// Transaction amounts must be strictly positive.
    #[error("Transaction amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// A budget cannot open with a negative balance.
    #[error("Initial budget amount cannot be negative, got {0}")]
    NegativeSeed(Decimal),

    /// Amount needs more than 15 integer digits or 4 decimal places.
    #[error("Amount {0} is out of range: at most 15 integer digits and 4 decimal places")]
    AmountOutOfRange(Decimal),

    /// A running balance or shift would leave the storable range.
    #[error("Balance would exceed the storable range")]
    BalanceOutOfRange,

    /// A balance in the ledger would drop below zero.
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        /// Balance before the offending movement.
        available: Decimal,
        /// Amount that had to be covered.
        required: Decimal,
    },
}

impl LedgerError {
    /// Returns the error classification.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTransactionType(_)
            | Self::NonPositiveAmount(_)
            | Self::NegativeSeed(_)
            | Self::AmountOutOfRange(_)
            | Self::BalanceOutOfRange => ErrorKind::InvalidInput,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransactionType(_) => "INVALID_TRANSACTION_TYPE",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::NegativeSeed(_) => "NEGATIVE_INITIAL_AMOUNT",
            Self::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            Self::BalanceOutOfRange => "BALANCE_OUT_OF_RANGE",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
        }
    }
}
