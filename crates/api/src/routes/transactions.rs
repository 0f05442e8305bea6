//! Transaction routes.
//!
//! Create, update and delete go through the transaction repository, which
//! keeps the budget history consistent with every change.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use finly_core::ledger::TransactionType;
use finly_db::{NewTransaction, TransactionChanges, entities::transactions};
use finly_shared::types::{BudgetId, CategoryId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{ApiError, AppState, middleware::CallerId};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions/{transaction_id}",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Budget to book against.
    pub budget_id: Uuid,
    /// Spending category.
    pub category_id: Uuid,
    /// Strictly positive amount.
    pub amount: Decimal,
    /// `deposit` or `withdrawal`.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// Optional note.
    #[serde(default)]
    pub note: String,
}

/// Request body for updating a transaction. Absent fields are left as is.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    /// New category.
    pub category_id: Option<Uuid>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New type.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// New note.
    pub note: Option<String>,
}

impl UpdateTransactionRequest {
    fn into_changes(self) -> Result<TransactionChanges, ApiError> {
        let transaction_type = self
            .transaction_type
            .as_deref()
            .map(str::parse::<TransactionType>)
            .transpose()?;

        Ok(TransactionChanges {
            category_id: self.category_id.map(CategoryId::from_uuid),
            amount: self.amount,
            transaction_type,
            note: self.note,
        })
    }
}

/// Response for a transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: Uuid,
    /// Budget ID.
    pub budget_id: Uuid,
    /// Category ID.
    pub category_id: Uuid,
    /// Amount.
    pub amount: String,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// Note.
    pub note: String,
    /// Created at timestamp.
    pub created_at: String,
}

impl From<transactions::Model> for TransactionResponse {
    fn from(m: transactions::Model) -> Self {
        Self {
            id: m.id,
            budget_id: m.budget_id,
            category_id: m.category_id,
            amount: m.amount.to_string(),
            transaction_type: m.transaction_type,
            note: m.note,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET `/transactions` - The caller's transactions, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<impl IntoResponse, ApiError> {
    let transactions: Vec<TransactionResponse> = state
        .transactions
        .list(caller.user_id())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(json!({ "transactions": transactions })))
}

/// POST `/transactions` - Record a deposit or withdrawal.
async fn create_transaction(
    State(state): State<AppState>,
    caller: CallerId,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction_type: TransactionType = payload.transaction_type.parse()?;

    let id = state
        .transactions
        .create(NewTransaction {
            user_id: caller.user_id(),
            budget_id: BudgetId::from_uuid(payload.budget_id),
            category_id: CategoryId::from_uuid(payload.category_id),
            amount: payload.amount,
            transaction_type,
            note: payload.note,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// GET `/transactions/{transaction_id}` - One of the caller's transactions.
async fn get_transaction(
    State(state): State<AppState>,
    caller: CallerId,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let transaction = state
        .transactions
        .find(TransactionId::from_uuid(transaction_id), caller.user_id())
        .await?;

    Ok(Json(transaction.into()))
}

/// PATCH `/transactions/{transaction_id}` - Edit a transaction.
async fn update_transaction(
    State(state): State<AppState>,
    caller: CallerId,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = payload.into_changes()?;

    state
        .transactions
        .update(
            TransactionId::from_uuid(transaction_id),
            caller.user_id(),
            changes,
        )
        .await?;

    Ok(Json(json!({})))
}

/// DELETE `/transactions/{transaction_id}` - Remove a transaction.
async fn delete_transaction(
    State(state): State<AppState>,
    caller: CallerId,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .transactions
        .delete(TransactionId::from_uuid(transaction_id), caller.user_id())
        .await?;

    Ok(Json(json!({})))
}
