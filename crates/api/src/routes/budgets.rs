//! Budget routes: opening a budget and reading its ledger.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use finly_db::{
    CreateBudgetInput,
    entities::{budgets, budgets_history},
};
use finly_shared::types::BudgetId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{ApiError, AppState, middleware::CallerId};

/// Creates the budget routes (requires identity middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", post(create_budget))
        .route("/budgets/me", get(get_my_budget))
        .route("/budgets/{budget_id}/history", get(get_budget_history))
        .route("/budgets/{budget_id}/balance", get(get_budget_balance))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening a budget.
#[derive(Debug, Deserialize)]
pub struct CreateBudgetRequest {
    /// ISO 4217 currency code.
    pub currency: String,
    /// Opening balance, zero when omitted.
    #[serde(default)]
    pub amount: Decimal,
}

/// Response for a budget.
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    /// Budget ID.
    pub id: Uuid,
    /// Owner.
    pub user_id: Uuid,
    /// Currency code.
    pub currency: String,
    /// Created at timestamp.
    pub created_at: String,
    /// Updated at timestamp.
    pub updated_at: String,
}

impl From<budgets::Model> for BudgetResponse {
    fn from(m: budgets::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            currency: m.currency,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

/// Response for one ledger entry.
#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    /// Entry ID.
    pub id: Uuid,
    /// `None` for the opening balance.
    pub transaction_id: Option<Uuid>,
    /// Running balance after this entry.
    pub balance: String,
    /// Created at timestamp.
    pub created_at: String,
}

impl From<budgets_history::Model> for LedgerEntryResponse {
    fn from(m: budgets_history::Model) -> Self {
        Self {
            id: m.id,
            transaction_id: m.transaction_id,
            balance: m.balance.to_string(),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// Response for the current balance.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Budget ID.
    pub budget_id: Uuid,
    /// Balance of the latest entry.
    pub balance: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST `/budgets` - Open the caller's budget.
async fn create_budget(
    State(state): State<AppState>,
    caller: CallerId,
    Json(payload): Json<CreateBudgetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let budget = state
        .budgets
        .create(CreateBudgetInput {
            user_id: caller.user_id(),
            currency: payload.currency,
            initial_amount: payload.amount,
        })
        .await?;

    info!(budget_id = %budget.id, user_id = %caller.user_id(), "Budget opened via API");

    Ok((StatusCode::CREATED, Json(json!({ "id": budget.id }))))
}

/// GET `/budgets/me` - The caller's budget.
async fn get_my_budget(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<Json<BudgetResponse>, ApiError> {
    let budget = state.budgets.get_by_user(caller.user_id()).await?;
    Ok(Json(budget.into()))
}

/// GET `/budgets/{budget_id}/history` - Ledger entries, oldest first.
async fn get_budget_history(
    State(state): State<AppState>,
    caller: CallerId,
    Path(budget_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let budget_id = owned_budget(&state, caller, budget_id).await?;
    let entries: Vec<LedgerEntryResponse> = state
        .budgets
        .history(budget_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "entries": entries })))
}

/// GET `/budgets/{budget_id}/balance` - Current balance.
async fn get_budget_balance(
    State(state): State<AppState>,
    caller: CallerId,
    Path(budget_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let budget_id = owned_budget(&state, caller, budget_id).await?;
    let balance = state.budgets.current_balance(budget_id).await?;

    Ok(Json(BalanceResponse {
        budget_id: budget_id.into_inner(),
        balance: balance.to_string(),
    }))
}

/// A budget the caller does not own reads as missing.
async fn owned_budget(
    state: &AppState,
    caller: CallerId,
    budget_id: Uuid,
) -> Result<BudgetId, ApiError> {
    let budget = state.budgets.get_by_user(caller.user_id()).await?;

    if budget.id == budget_id {
        Ok(BudgetId::from_uuid(budget_id))
    } else {
        Err(ApiError::not_found(format!("Budget not found: {budget_id}")))
    }
}
