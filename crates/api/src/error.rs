//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use finly_core::ledger::LedgerError;
use finly_db::{BudgetError, TransactionError};
use finly_shared::AppError;
use serde_json::json;
use tracing::error;

/// Handler error rendered as `{"error": <code>, "message": <text>}`.
///
/// Balance rule violations keep their own code (`NON_POSITIVE_AMOUNT`,
/// `AMOUNT_OUT_OF_RANGE`, ...); everything else uses the [`AppError`] code.
#[derive(Debug)]
pub struct ApiError {
    error: AppError,
    code: Option<&'static str>,
}

impl ApiError {
    /// Caller identity is missing or malformed.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into()).into()
    }

    /// Resource does not exist for the caller.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into()).into()
    }

    /// The underlying application error.
    #[must_use]
    pub const fn error(&self) -> &AppError {
        &self.error
    }

    /// Code rendered in the `error` field.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code.unwrap_or_else(|| self.error.error_code())
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self { error, code: None }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self {
            error: AppError::from_kind(err.kind(), err.to_string()),
            code: Some(err.error_code()),
        }
    }
}

impl From<BudgetError> for ApiError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::Ledger(ledger) => ledger.into(),
            other => AppError::from(other).into(),
        }
    }
}

impl From<TransactionError> for ApiError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Ledger(ledger) => ledger.into(),
            other => AppError::from(other).into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = self.code();

        // Storage details stay in the logs.
        let message = if self.error.is_server_error() {
            error!(error = %self.error, "Request failed");
            "An error occurred".to_string()
        } else {
            self.error.to_string()
        };

        (
            status,
            Json(json!({
                "error": code,
                "message": message
            })),
        )
            .into_response()
    }
}
