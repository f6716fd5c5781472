//! # API Error Type
//!
//! Unified error type returned by every [`PosService`](crate::service::PosService)
//! operation.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cashdesk                               │
//! │                                                                         │
//! │  PosService::create_transaction                                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Malformed date / amount? ─── ValidationError ──────────┐              │
//! │         │                                               │              │
//! │         ▼                                               ▼              │
//! │  Ledger / Store / Reports ─── DbError ─────────────► ApiError          │
//! │         │                     ├ Core(InsufficientStock)  code: ...     │
//! │         │                     ├ Core(AlreadyCancelled)   message: ...  │
//! │         │                     └ Busy / Timeout (retryable)             │
//! │         ▼                                                               │
//! │  Success ──────────────────────────────────────────────────────────►   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers switch on `code`; `message` is for display:
//! ```json
//! {
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for COKE-330: 3 available, 5 requested"
//! }
//! ```

use cashdesk_core::{CoreError, ValidationError};
use cashdesk_db::DbError;
use serde::Serialize;

/// Error returned from service operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Transaction or product does not exist (404)
    NotFound,

    /// Cancellation of a cancelled transaction (409)
    AlreadyCancelled,

    /// Checkout or add-item shortfall (409)
    InsufficientStock,

    /// Input validation failed (400)
    ValidationError,

    /// Business rule conflict other than the ones above (409)
    Conflict,

    /// Contention or timeout; the same request may be sent again (503)
    Retryable,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// Whether sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::Retryable
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Core(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            err @ (DbError::Busy(_) | DbError::Timeout { .. } | DbError::PoolExhausted) => {
                tracing::warn!(error = %err, "Retryable database failure");
                ApiError::new(ErrorCode::Retryable, err.to_string())
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::TransactionNotFound(id) => ApiError::not_found("Transaction", &id),
            CoreError::AlreadyCancelled(id) => ApiError::new(
                ErrorCode::AlreadyCancelled,
                format!("Transaction {} is already cancelled", id),
            ),
            CoreError::InsufficientStock {
                sku,
                available,
                requested,
                ..
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for {}: {} available, {} requested",
                    sku, available, requested
                ),
            ),
            CoreError::TransactionNumberCollision(number) => {
                tracing::error!(transaction_number = %number, "Transaction number retries exhausted");
                ApiError::new(ErrorCode::Retryable, "Could not allocate a transaction number")
            }
            e @ (CoreError::InvalidStatusTransition { .. } | CoreError::SkuLocked(_)) => {
                ApiError::new(ErrorCode::Conflict, e.to_string())
            }
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
