//! # Error Types
//!
//! Domain-specific error types for cashdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cashdesk-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule conflicts                        │
//! │  └── ValidationError  - Malformed input (caller's fault)               │
//! │                                                                         │
//! │  cashdesk-db errors (separate crate)                                   │
//! │  └── DbError          - Persistence failures, wraps CoreError          │
//! │                                                                         │
//! │  Request layer (apps/cashdesk)                                         │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::TransactionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product id does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock to reserve the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (COKE-330 × 5)
    ///      │
    ///      ▼
    /// reserve(): available=3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "COKE-330", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Cashier sees: "Insufficient stock for COKE-330: available 3, requested 5"
    /// ```
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Transaction id does not exist.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Cancellation of a transaction that is already cancelled.
    #[error("Transaction {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Generated transaction number clashed with an existing one, even after retrying.
    #[error("Transaction number collision: {0}")]
    TransactionNumberCollision(String),

    /// The status state machine does not allow this move.
    #[error("Transaction {transaction_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        transaction_id: String,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// SKU change on a product that already appears on a transaction.
    #[error("SKU of product {0} is locked by transaction history")]
    SkuLocked(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for the shortfall error.
    pub fn insufficient_stock(
        product_id: impl Into<String>,
        sku: impl Into<String>,
        available: i64,
        requested: i64,
    ) -> Self {
        CoreError::InsufficientStock {
            product_id: product_id.into(),
            sku: sku.into(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid date, invalid amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Collection has more entries than allowed.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_names_product_and_shortfall() {
        let err = CoreError::insufficient_stock("p-1", "COKE-330", 3, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COKE-330: available 3, requested 5"
        );
    }

    #[test]
    fn test_cancellation_errors_are_distinct() {
        let missing = CoreError::TransactionNotFound("t-1".to_string());
        let cancelled = CoreError::AlreadyCancelled("t-1".to_string());
        assert_eq!(missing.to_string(), "Transaction not found: t-1");
        assert_eq!(cancelled.to_string(), "Transaction t-1 is already cancelled");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = CoreError::InvalidStatusTransition {
            transaction_id: "t-9".to_string(),
            from: TransactionStatus::Cancelled,
            to: TransactionStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Transaction t-9 cannot move from cancelled to completed"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "user_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
