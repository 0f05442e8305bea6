//! Ledger consistency tests against an in-memory SQLite database.
//!
//! Each mutation either moves every affected row or none, and stored
//! balances always equal a replay of the movements in ledger order.

#![allow(clippy::too_many_lines)]

mod common;

use std::collections::HashMap;

use finly_core::ledger::{replay_balances, LedgerError, TransactionType};
use finly_db::entities::transactions;
use finly_db::{TransactionChanges, TransactionError};
use finly_shared::types::{BudgetId, CategoryId, TransactionId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;

use common::{balances, harness, history, movement, open_budget, snapshot, Harness};
use TransactionType::{Deposit, Withdrawal};

/// Recomputes balances from the seed entry and the transactions in history order.
async fn replayed(h: &Harness, budget_id: BudgetId) -> Vec<Decimal> {
    let entries = history(h, budget_id).await;
    let rows: HashMap<_, _> = transactions::Entity::find()
        .all(&h.db)
        .await
        .unwrap()
        .into_iter()
        .map(|tx| (tx.id, tx))
        .collect();

    let mut seed = Decimal::ZERO;
    let mut seeded = Vec::new();
    let mut movements = Vec::new();
    for entry in &entries {
        match entry.transaction_id {
            None => {
                seed = entry.balance;
                seeded.push(entry.balance);
            }
            Some(id) => {
                let tx = &rows[&id];
                movements.push((tx.transaction_type.parse().unwrap(), tx.amount));
            }
        }
    }

    seeded.extend(replay_balances(seed, movements).unwrap());
    seeded
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_deposits_and_withdrawal_append_running_balances() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    assert!(balances(&h, budget).await.is_empty());

    h.transactions.create(movement(user, budget, Deposit, dec!(100))).await.unwrap();
    h.transactions.create(movement(user, budget, Deposit, dec!(50))).await.unwrap();
    h.transactions.create(movement(user, budget, Withdrawal, dec!(30))).await.unwrap();

    assert_eq!(balances(&h, budget).await, vec![dec!(100), dec!(150), dec!(120)]);
    assert_eq!(balances(&h, budget).await, replayed(&h, budget).await);
}

#[tokio::test]
async fn test_history_timestamps_strictly_increase() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(10)).await;

    for _ in 0..20 {
        h.transactions.create(movement(user, budget, Deposit, dec!(1))).await.unwrap();
    }

    let entries = history(&h, budget).await;
    assert_eq!(entries.len(), 21);
    for pair in entries.windows(2) {
        assert!(pair[0].created_at < pair[1].created_at);
    }
}

#[tokio::test]
async fn test_overdrawing_withdrawal_is_rejected_without_writes() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    h.transactions.create(movement(user, budget, Deposit, dec!(50))).await.unwrap();
    let before = snapshot(&h).await;

    let err = h
        .transactions
        .create(movement(user, budget, Withdrawal, dec!(80)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Ledger(LedgerError::InsufficientBalance { .. })
    ));
    assert_eq!(snapshot(&h).await, before);
    assert_eq!(balances(&h, budget).await, vec![dec!(50)]);
}

#[tokio::test]
async fn test_first_withdrawal_on_empty_history_is_rejected() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;

    let err = h
        .transactions
        .create(movement(user, budget, Withdrawal, dec!(1)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Ledger(LedgerError::InsufficientBalance { .. })
    ));
    assert!(snapshot(&h).await.0.is_empty());
}

#[tokio::test]
async fn test_withdrawal_may_drain_to_zero() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(40)).await;

    h.transactions.create(movement(user, budget, Withdrawal, dec!(40))).await.unwrap();

    assert_eq!(balances(&h, budget).await, vec![dec!(40), dec!(0)]);
}

#[tokio::test]
async fn test_non_positive_amount_is_rejected() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;

    for amount in [dec!(0), dec!(-5)] {
        let err = h
            .transactions
            .create(movement(user, budget, Deposit, amount))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Ledger(LedgerError::NonPositiveAmount(_))
        ));
    }
    assert!(snapshot(&h).await.0.is_empty());
}

#[tokio::test]
async fn test_unstorable_amount_is_rejected() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;

    // five decimal places would round to 0.0000 in a NUMERIC(19, 4) column
    for amount in [Decimal::MAX, dec!(0.00001), dec!(12.34565)] {
        let err = h
            .transactions
            .create(movement(user, budget, Deposit, amount))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Ledger(LedgerError::AmountOutOfRange(a)) if a == amount
        ));
    }
    assert!(snapshot(&h).await.0.is_empty());

    h.transactions
        .create(movement(user, budget, Deposit, dec!(0.0625)))
        .await
        .unwrap();
    assert_eq!(balances(&h, budget).await, vec![dec!(0.0625)]);
}

#[tokio::test]
async fn test_create_against_foreign_budget_is_not_found() {
    let h = harness().await;
    let owner = UserId::new();
    let intruder = UserId::new();
    let budget = open_budget(&h, owner, dec!(100)).await;

    let err = h
        .transactions
        .create(movement(intruder, budget, Deposit, dec!(5)))
        .await
        .unwrap_err();

    assert!(matches!(err, TransactionError::BudgetNotFound(id) if id == budget));
    assert_eq!(balances(&h, budget).await, vec![dec!(100)]);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_amount_edit_shifts_edited_and_later_entries() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    h.transactions.create(movement(user, budget, Deposit, dec!(100))).await.unwrap();
    let t2 = h.transactions.create(movement(user, budget, Deposit, dec!(50))).await.unwrap();
    h.transactions.create(movement(user, budget, Withdrawal, dec!(30))).await.unwrap();

    h.transactions
        .update(
            t2,
            user,
            TransactionChanges {
                amount: Some(dec!(70)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(balances(&h, budget).await, vec![dec!(100), dec!(170), dec!(140)]);
    assert_eq!(h.transactions.find(t2, user).await.unwrap().amount, dec!(70));
    assert_eq!(balances(&h, budget).await, replayed(&h, budget).await);
}

#[tokio::test]
async fn test_editing_first_entry_shifts_whole_history() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(100))).await.unwrap();
    h.transactions.create(movement(user, budget, Deposit, dec!(50))).await.unwrap();
    h.transactions.create(movement(user, budget, Withdrawal, dec!(30))).await.unwrap();

    h.transactions
        .update(
            t1,
            user,
            TransactionChanges {
                amount: Some(dec!(50)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(balances(&h, budget).await, vec![dec!(50), dec!(100), dec!(70)]);
    assert_eq!(h.budgets.current_balance(budget).await.unwrap(), dec!(70));
}

#[tokio::test]
async fn test_type_flip_applies_double_delta() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    h.transactions.create(movement(user, budget, Deposit, dec!(100))).await.unwrap();
    let t2 = h.transactions.create(movement(user, budget, Deposit, dec!(25))).await.unwrap();

    h.transactions
        .update(
            t2,
            user,
            TransactionChanges {
                transaction_type: Some(Withdrawal),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(balances(&h, budget).await, vec![dec!(100), dec!(75)]);
    assert_eq!(
        h.transactions.find(t2, user).await.unwrap().transaction_type,
        "withdrawal"
    );
}

#[tokio::test]
async fn test_edit_that_would_go_negative_changes_nothing() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(100))).await.unwrap();
    h.transactions.create(movement(user, budget, Withdrawal, dec!(70))).await.unwrap();
    let before = snapshot(&h).await;

    let err = h
        .transactions
        .update(
            t1,
            user,
            TransactionChanges {
                amount: Some(dec!(50)),
                note: Some("should not stick".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Ledger(LedgerError::InsufficientBalance { .. })
    ));
    assert_eq!(snapshot(&h).await, before);
}

#[tokio::test]
async fn test_note_only_edit_leaves_history_alone() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(10))).await.unwrap();
    let entries_before = history(&h, budget).await;

    h.transactions
        .update(
            t1,
            user,
            TransactionChanges {
                note: Some("groceries".to_string()),
                amount: Some(dec!(10)),
                transaction_type: Some(Deposit),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(history(&h, budget).await, entries_before);
    assert_eq!(h.transactions.find(t1, user).await.unwrap().note, "groceries");
}

#[tokio::test]
async fn test_empty_edit_is_accepted() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(10))).await.unwrap();
    let before = snapshot(&h).await;

    h.transactions
        .update(t1, user, TransactionChanges::default())
        .await
        .unwrap();

    assert_eq!(snapshot(&h).await, before);
}

#[tokio::test]
async fn test_edit_by_other_user_is_not_found() {
    let h = harness().await;
    let owner = UserId::new();
    let budget = open_budget(&h, owner, dec!(0)).await;
    let t1 = h.transactions.create(movement(owner, budget, Deposit, dec!(10))).await.unwrap();

    let err = h
        .transactions
        .update(
            t1,
            UserId::new(),
            TransactionChanges {
                amount: Some(dec!(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransactionError::NotFound(id) if id == t1));
    assert_eq!(balances(&h, budget).await, vec![dec!(10)]);
}

#[tokio::test]
async fn test_edit_with_invalid_amount_is_rejected_up_front() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(10))).await.unwrap();

    let err = h
        .transactions
        .update(
            t1,
            user,
            TransactionChanges {
                amount: Some(dec!(0)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Ledger(LedgerError::NonPositiveAmount(_))
    ));
}

#[tokio::test]
async fn test_edit_to_unstorable_amount_changes_nothing() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(10))).await.unwrap();
    h.transactions.create(movement(user, budget, Deposit, dec!(5))).await.unwrap();
    let before = snapshot(&h).await;

    for amount in [Decimal::MAX, dec!(0.00001), dec!(1000000000000000)] {
        let err = h
            .transactions
            .update(
                t1,
                user,
                TransactionChanges {
                    amount: Some(amount),
                    transaction_type: Some(Withdrawal),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Ledger(LedgerError::AmountOutOfRange(a)) if a == amount
        ));
    }

    assert_eq!(snapshot(&h).await, before);
}

#[tokio::test]
async fn test_deposit_past_storable_balance_changes_nothing() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(999999999999999)).await;
    let before = snapshot(&h).await;

    let err = h
        .transactions
        .create(movement(user, budget, Deposit, dec!(1)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Ledger(LedgerError::BalanceOutOfRange)
    ));
    assert_eq!(snapshot(&h).await, before);
}

#[tokio::test]
async fn test_category_only_edit_updates_row() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(10))).await.unwrap();
    let entries_before = history(&h, budget).await;
    let category = CategoryId::new();

    h.transactions
        .update(
            t1,
            user,
            TransactionChanges {
                category_id: Some(category),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = h.transactions.find(t1, user).await.unwrap();
    assert_eq!(stored.category_id, category.into_inner());
    assert_eq!(stored.amount, dec!(10));
    assert_eq!(history(&h, budget).await, entries_before);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_removes_entry_and_shifts_later_ones() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(100))).await.unwrap();
    let t2 = h.transactions.create(movement(user, budget, Deposit, dec!(50))).await.unwrap();
    h.transactions.create(movement(user, budget, Withdrawal, dec!(30))).await.unwrap();
    h.transactions
        .update(
            t2,
            user,
            TransactionChanges {
                amount: Some(dec!(70)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    h.transactions.delete(t1, user).await.unwrap();

    assert_eq!(balances(&h, budget).await, vec![dec!(70), dec!(40)]);
    assert!(matches!(
        h.transactions.find(t1, user).await,
        Err(TransactionError::NotFound(_))
    ));
    assert_eq!(balances(&h, budget).await, replayed(&h, budget).await);
}

#[tokio::test]
async fn test_delete_of_latest_entry_touches_nothing_else() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(20)).await;
    h.transactions.create(movement(user, budget, Deposit, dec!(5))).await.unwrap();
    let last = h.transactions.create(movement(user, budget, Withdrawal, dec!(10))).await.unwrap();

    h.transactions.delete(last, user).await.unwrap();

    assert_eq!(balances(&h, budget).await, vec![dec!(20), dec!(25)]);
}

#[tokio::test]
async fn test_delete_that_would_go_negative_changes_nothing() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;
    let t1 = h.transactions.create(movement(user, budget, Deposit, dec!(100))).await.unwrap();
    h.transactions.create(movement(user, budget, Withdrawal, dec!(80))).await.unwrap();
    let before = snapshot(&h).await;

    let err = h.transactions.delete(t1, user).await.unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Ledger(LedgerError::InsufficientBalance { .. })
    ));
    assert_eq!(snapshot(&h).await, before);
}

#[tokio::test]
async fn test_delete_missing_or_foreign_transaction_is_not_found() {
    let h = harness().await;
    let owner = UserId::new();
    let budget = open_budget(&h, owner, dec!(0)).await;
    let t1 = h.transactions.create(movement(owner, budget, Deposit, dec!(10))).await.unwrap();

    let missing = TransactionId::new();
    assert!(matches!(
        h.transactions.delete(missing, owner).await,
        Err(TransactionError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        h.transactions.delete(t1, UserId::new()).await,
        Err(TransactionError::NotFound(_))
    ));
    assert_eq!(balances(&h, budget).await, vec![dec!(10)]);
}

#[tokio::test]
async fn test_budgets_are_isolated() {
    let h = harness().await;
    let alice = UserId::new();
    let bob = UserId::new();
    let alice_budget = open_budget(&h, alice, dec!(0)).await;
    let bob_budget = open_budget(&h, bob, dec!(500)).await;

    let a1 = h.transactions.create(movement(alice, alice_budget, Deposit, dec!(10))).await.unwrap();
    h.transactions.create(movement(bob, bob_budget, Withdrawal, dec!(100))).await.unwrap();
    h.transactions.create(movement(alice, alice_budget, Deposit, dec!(5))).await.unwrap();
    h.transactions.delete(a1, alice).await.unwrap();

    assert_eq!(balances(&h, alice_budget).await, vec![dec!(5)]);
    assert_eq!(balances(&h, bob_budget).await, vec![dec!(500), dec!(400)]);
}

// ============================================================================
// Replay after a mixed workload
// ============================================================================

#[tokio::test]
async fn test_stored_balances_match_replay_after_mixed_workload() {
    let h = harness().await;
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(250)).await;

    let mut ids = Vec::new();
    for (kind, amount) in [
        (Deposit, dec!(40)),
        (Withdrawal, dec!(90)),
        (Deposit, dec!(12.50)),
        (Withdrawal, dec!(60)),
        (Deposit, dec!(300)),
        (Withdrawal, dec!(125.25)),
    ] {
        ids.push(
            h.transactions
                .create(movement(user, budget, kind, amount))
                .await
                .unwrap(),
        );
    }

    h.transactions
        .update(
            ids[1],
            user,
            TransactionChanges {
                amount: Some(dec!(45)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    h.transactions.delete(ids[3], user).await.unwrap();
    h.transactions
        .update(
            ids[0],
            user,
            TransactionChanges {
                transaction_type: Some(Withdrawal),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = balances(&h, budget).await;
    assert_eq!(stored, replayed(&h, budget).await);
    assert!(stored.iter().all(|b| *b >= Decimal::ZERO));
    assert_eq!(stored.len(), 6);
    assert_eq!(h.budgets.current_balance(budget).await.unwrap(), *stored.last().unwrap());
}
