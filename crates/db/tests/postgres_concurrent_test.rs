//! Concurrent writers against one budget on Postgres.
//!
//! SQLite serializes every writer on its database lock, so only a real
//! Postgres server shows that the per-budget `FOR UPDATE` lock prevents lost
//! updates and joint overdrafts. Tasks start together behind a barrier.
//!
//! Skipped when `DATABASE_URL` (or `FINLY__DATABASE__URL`) does not reach a
//! Postgres server.

#![allow(clippy::items_after_statements)]

mod common;

use std::sync::Arc;

use finly_core::ledger::LedgerError;
use finly_core::ledger::TransactionType::{Deposit, Withdrawal};
use finly_db::{TransactionChanges, TransactionError};
use finly_shared::types::UserId;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use common::{balances, history, movement, open_budget, postgres_harness, remove_budget};

// ============================================================================
// Concurrent appends
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_deposits_lose_nothing_on_postgres() {
    let Some(h) = postgres_harness().await else {
        return;
    };
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;

    const WRITERS: usize = 40;
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (1..=WRITERS)
        .map(|i| {
            let repo = h.transactions.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                repo.create(movement(user, budget, Deposit, Decimal::from(i)))
                    .await
            })
        })
        .collect();

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    let entries = history(&h, budget).await;
    assert_eq!(entries.len(), WRITERS);
    assert_eq!(
        entries.last().unwrap().balance,
        Decimal::from(WRITERS * (WRITERS + 1) / 2)
    );
    for pair in entries.windows(2) {
        assert!(pair[0].created_at < pair[1].created_at);
        assert!(pair[0].balance < pair[1].balance);
    }

    remove_budget(&h, budget).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_withdrawals_never_overdraw_on_postgres() {
    let Some(h) = postgres_harness().await else {
        return;
    };
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(100)).await;

    const WRITERS: usize = 20;
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let repo = h.transactions.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                repo.create(movement(user, budget, Withdrawal, dec!(30)))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    let mut rejected = 0;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => accepted += 1,
            Err(TransactionError::Ledger(LedgerError::InsufficientBalance { .. })) => {
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(rejected, WRITERS - 3);
    assert_eq!(
        balances(&h, budget).await,
        vec![dec!(100), dec!(70), dec!(40), dec!(10)]
    );

    remove_budget(&h, budget).await;
}

// ============================================================================
// Concurrent edits
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_edits_shift_history_exactly_once_on_postgres() {
    let Some(h) = postgres_harness().await else {
        return;
    };
    let user = UserId::new();
    let budget = open_budget(&h, user, dec!(0)).await;

    const ENTRIES: usize = 12;
    let mut ids = Vec::with_capacity(ENTRIES);
    for _ in 0..ENTRIES {
        ids.push(
            h.transactions
                .create(movement(user, budget, Deposit, dec!(10)))
                .await
                .unwrap(),
        );
    }

    let barrier = Arc::new(Barrier::new(ENTRIES));
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let repo = h.transactions.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                repo.update(
                    id,
                    user,
                    TransactionChanges {
                        amount: Some(dec!(25)),
                        ..Default::default()
                    },
                )
                .await
            })
        })
        .collect();

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    // every shift landed once: entry i holds 25 * (i + 1)
    let expected: Vec<Decimal> = (1..=ENTRIES).map(|i| dec!(25) * Decimal::from(i)).collect();
    assert_eq!(balances(&h, budget).await, expected);

    remove_budget(&h, budget).await;
}
