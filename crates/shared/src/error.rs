//! Application-wide error types.
//!
//! Every failure that crosses a crate boundary is classified by an
//! [`ErrorKind`]. The HTTP layer maps kinds to status codes, and callers
//! branch on the kind instead of matching driver-specific error text.

use thiserror::Error;

/// Classification of failures surfaced by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input (unknown type, non-positive amount).
    InvalidInput,
    /// A balance would go negative.
    InsufficientBalance,
    /// Budget, transaction, or ledger entry does not exist for the caller.
    NotFound,
    /// Persistence failure.
    Storage,
    /// Cache backend failure. Never propagated out of read or write paths.
    Cache,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::NotFound => 404,
            Self::InsufficientBalance => 422,
            Self::Storage | Self::Cache => 500,
        }
    }
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Caller identity missing or malformed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Withdrawal or edit would drive a balance negative.
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds an error of the variant that corresponds to `kind`.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::InvalidInput => Self::Validation(message),
            ErrorKind::InsufficientBalance => Self::InsufficientBalance(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Storage => Self::Database(message),
            ErrorKind::Cache => Self::Internal(message),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::InsufficientBalance(_) => 422,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error indicates a server-side fault rather than bad input.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}
