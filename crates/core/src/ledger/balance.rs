//! Running-balance arithmetic.
//!
//! Every function here is pure. Callers read the prior state from storage,
//! ask this module what the new state should be, and write the answer back
//! inside one atomic scope.

use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::TransactionType;

/// Anything that carries a running balance.
pub trait Balanced {
    /// The balance recorded after this entry was applied.
    fn balance(&self) -> Decimal;
}

impl Balanced for Decimal {
    fn balance(&self) -> Decimal {
        *self
    }
}

/// A ledger entry paired with the balance it should hold after a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceUpdate<'a, T> {
    /// The entry being rewritten.
    pub entry: &'a T,
    /// Its new running balance.
    pub balance: Decimal,
}

/// Exclusive upper bound for amounts and balances: `10^15`, the integer part
/// of a `NUMERIC(19, 4)` column.
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Most decimal places an amount may carry.
pub const MAX_SCALE: u32 = 4;

fn storable(amount: Decimal) -> bool {
    amount.abs() < AMOUNT_LIMIT && amount.normalize().scale() <= MAX_SCALE
}

fn bounded(balance: Option<Decimal>) -> Result<Decimal, LedgerError> {
    balance
        .filter(|b| b.abs() < AMOUNT_LIMIT)
        .ok_or(LedgerError::BalanceOutOfRange)
}

/// Rejects zero, negative, and unstorable transaction amounts.
///
/// Trailing zeros do not count towards the scale, so `1.50000` is accepted.
///
/// # Errors
///
/// Returns [`LedgerError::NonPositiveAmount`] or
/// [`LedgerError::AmountOutOfRange`].
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount(amount));
    }
    if !storable(amount) {
        return Err(LedgerError::AmountOutOfRange(amount));
    }
    Ok(amount)
}

/// Rejects a negative or unstorable opening balance. Zero is allowed.
///
/// # Errors
///
/// Returns [`LedgerError::NegativeSeed`] or [`LedgerError::AmountOutOfRange`].
pub fn validate_seed(amount: Decimal) -> Result<Decimal, LedgerError> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::NegativeSeed(amount));
    }
    if !storable(amount) {
        return Err(LedgerError::AmountOutOfRange(amount));
    }
    Ok(amount)
}

/// `+amount` for deposits, `-amount` for withdrawals.
#[must_use]
pub fn signed_amount(transaction_type: TransactionType, amount: Decimal) -> Decimal {
    match transaction_type {
        TransactionType::Deposit => amount,
        TransactionType::Withdrawal => -amount,
    }
}

/// Computes the balance after appending a movement.
///
/// `prior` is the balance of the budget's latest ledger entry, or `None` when
/// the budget has no history yet.
///
/// # Errors
///
/// Returns [`LedgerError::InsufficientBalance`] for a withdrawal larger than
/// `prior`, or any withdrawal against an empty history, and
/// [`LedgerError::BalanceOutOfRange`] when a deposit would push the balance
/// past [`AMOUNT_LIMIT`].
pub fn project_new_balance(
    prior: Option<Decimal>,
    amount: Decimal,
    transaction_type: TransactionType,
) -> Result<Decimal, LedgerError> {
    match (transaction_type, prior) {
        (TransactionType::Deposit, None) => bounded(Some(amount)),
        (TransactionType::Deposit, Some(balance)) => bounded(balance.checked_add(amount)),
        (TransactionType::Withdrawal, None) => Err(LedgerError::InsufficientBalance {
            available: Decimal::ZERO,
            required: amount,
        }),
        (TransactionType::Withdrawal, Some(balance)) if balance < amount => {
            Err(LedgerError::InsufficientBalance {
                available: balance,
                required: amount,
            })
        }
        (TransactionType::Withdrawal, Some(balance)) => bounded(balance.checked_sub(amount)),
    }
}

/// Shift applied to every later balance when a transaction is edited.
///
/// # Errors
///
/// Returns [`LedgerError::BalanceOutOfRange`] if the difference does not fit
/// in a `Decimal`.
pub fn delta(
    old_type: TransactionType,
    old_amount: Decimal,
    new_type: TransactionType,
    new_amount: Decimal,
) -> Result<Decimal, LedgerError> {
    signed_amount(new_type, new_amount)
        .checked_sub(signed_amount(old_type, old_amount))
        .ok_or(LedgerError::BalanceOutOfRange)
}

/// Shift applied to every later balance when a transaction is removed.
#[must_use]
pub fn invert_delta(transaction_type: TransactionType, amount: Decimal) -> Decimal {
    -signed_amount(transaction_type, amount)
}

/// Adds `delta` to every entry, all or nothing.
///
/// Entries are expected in ledger order. The result has one update per entry
/// in the same order.
///
/// # Errors
///
/// Returns [`LedgerError::InsufficientBalance`] for the first entry whose
/// balance would become negative, or [`LedgerError::BalanceOutOfRange`] for
/// the first one pushed past [`AMOUNT_LIMIT`]. No partial result is produced.
pub fn apply_delta_sequence<T: Balanced>(
    entries: &[T],
    delta: Decimal,
) -> Result<Vec<BalanceUpdate<'_, T>>, LedgerError> {
    entries
        .iter()
        .map(|entry| {
            let current = entry.balance();
            let balance = bounded(current.checked_add(delta))?;
            if balance < Decimal::ZERO {
                return Err(LedgerError::InsufficientBalance {
                    available: current,
                    required: -delta,
                });
            }
            Ok(BalanceUpdate { entry, balance })
        })
        .collect()
}

/// Recomputes every running balance from a seed and the ordered movements.
///
/// Used to audit stored history: the stored balances of a consistent ledger
/// equal this output.
///
/// # Errors
///
/// Returns [`LedgerError::InsufficientBalance`] if the movements would take
/// the balance below zero at any point.
pub fn replay_balances<I>(seed: Decimal, movements: I) -> Result<Vec<Decimal>, LedgerError>
where
    I: IntoIterator<Item = (TransactionType, Decimal)>,
{
    let mut running = seed;
    movements
        .into_iter()
        .map(|(transaction_type, amount)| {
            running = project_new_balance(Some(running), amount, transaction_type)?;
            Ok(running)
        })
        .collect()
}
