//! Property-based tests for running-balance arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{
    apply_delta_sequence, delta, invert_delta, project_new_balance, replay_balances,
    signed_amount,
};
use super::error::LedgerError;
use super::types::TransactionType;

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a non-negative balance.
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn transaction_type() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Deposit), Just(TransactionType::Withdrawal)]
}

fn movement() -> impl Strategy<Value = (TransactionType, Decimal)> {
    (transaction_type(), positive_amount())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Projection never produces a negative balance
    // =========================================================================

    /// Appending accepted movements one by one always leaves balances >= 0,
    /// and a replay of the accepted movements reproduces them exactly.
    #[test]
    fn prop_appended_balances_stay_non_negative(
        movements in prop::collection::vec(movement(), 0..40),
    ) {
        let mut prior: Option<Decimal> = None;
        let mut accepted = Vec::new();
        let mut balances = Vec::new();

        for (kind, amount) in movements {
            match project_new_balance(prior, amount, kind) {
                Ok(next) => {
                    prop_assert!(next >= Decimal::ZERO);
                    prior = Some(next);
                    accepted.push((kind, amount));
                    balances.push(next);
                }
                Err(LedgerError::InsufficientBalance { available, required }) => {
                    prop_assert_eq!(kind, TransactionType::Withdrawal);
                    prop_assert!(available < required);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }

        prop_assert_eq!(replay_balances(Decimal::ZERO, accepted).unwrap(), balances);
    }

    // =========================================================================
    // Delta algebra
    // =========================================================================

    /// Editing then reverting is a no-op, and an edit lands exactly on the new signed amount.
    #[test]
    fn prop_delta_is_difference_of_signed_amounts(
        (old_type, old_amount) in movement(),
        (new_type, new_amount) in movement(),
    ) {
        let forward = delta(old_type, old_amount, new_type, new_amount).unwrap();
        let back = delta(new_type, new_amount, old_type, old_amount).unwrap();
        prop_assert_eq!(forward + back, Decimal::ZERO);
        prop_assert_eq!(signed_amount(old_type, old_amount) + forward, signed_amount(new_type, new_amount));
        prop_assert_eq!(delta(old_type, old_amount, old_type, old_amount), Ok(Decimal::ZERO));
    }

    /// Removing a movement cancels its signed amount.
    #[test]
    fn prop_invert_cancels(
        (kind, amount) in movement(),
    ) {
        prop_assert_eq!(signed_amount(kind, amount) + invert_delta(kind, amount), Decimal::ZERO);
    }

    // =========================================================================
    // Delta propagation is all or nothing
    // =========================================================================

    /// Either every shifted balance is non-negative and exact, or the call fails
    /// and some entry really would have gone negative.
    #[test]
    fn prop_apply_delta_all_or_nothing(
        balances in prop::collection::vec(balance(), 0..30),
        shift in (-100_000_000i64..100_000_000i64).prop_map(|c| Decimal::new(c, 2)),
    ) {
        match apply_delta_sequence(&balances, shift) {
            Ok(updates) => {
                prop_assert_eq!(updates.len(), balances.len());
                for (update, original) in updates.iter().zip(&balances) {
                    prop_assert_eq!(update.balance, *original + shift);
                    prop_assert!(update.balance >= Decimal::ZERO);
                }
            }
            Err(LedgerError::InsufficientBalance { available, .. }) => {
                prop_assert!(balances.iter().any(|b| *b + shift < Decimal::ZERO));
                prop_assert!(available + shift < Decimal::ZERO);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }
}
