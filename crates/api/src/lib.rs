//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for budgets and transactions
//! - Caller identity middleware
//! - Error responses mapped from the shared error taxonomy

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use finly_db::{BudgetRepository, CacheAside, LedgerStore, TransactionRepository};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Budget opening and ledger reads.
    pub budgets: BudgetRepository,
    /// Transaction mutations and queries.
    pub transactions: TransactionRepository,
}

impl AppState {
    /// Wires the repositories over one connection pool and one cache.
    #[must_use]
    pub fn new(db: DatabaseConnection, cache: CacheAside) -> Self {
        let store = LedgerStore::new(db.clone(), cache);
        Self {
            db: Arc::new(db),
            budgets: BudgetRepository::new(store.clone()),
            transactions: TransactionRepository::new(store),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
