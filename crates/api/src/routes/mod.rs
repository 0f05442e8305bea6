//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::identity_middleware};

pub mod budgets;
pub mod health;
pub mod transactions;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    // Every ledger route is scoped to the caller
    let protected_routes = Router::new()
        .merge(budgets::routes())
        .merge(transactions::routes())
        .layer(middleware::from_fn(identity_middleware));

    Router::new().merge(health::routes()).merge(protected_routes)
}
