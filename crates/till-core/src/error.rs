//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - NotFound / Conflict / Forbidden / ...          │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | DbError, what callers see          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → controller (HTTP)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error answers `kind()`, which is all the controller layer needs to
//! pick a status code (404 / 409 / 403 / 400 / retry).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::OrderStatus;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of every failure the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A referenced session, sale, order or product does not exist (404).
    NotFound,
    /// A business rule rejected the operation (409). Retrying without
    /// changing the request repeats the same violation.
    Conflict,
    /// The principal may not perform the operation (403).
    Forbidden,
    /// Malformed or out-of-range input, rejected before any transaction (400).
    Validation,
    /// Lock contention or a stale snapshot. The whole operation may be retried.
    Concurrency,
    /// Anything else (storage failure, broken invariant).
    Internal,
}

impl ErrorKind {
    /// Only concurrency failures are safe to retry, and only as a whole.
    #[inline]
    pub const fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Concurrency)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Product exists but was deactivated in the catalog.
    #[error("Product \"{name}\" is not active")]
    ProductInactive { name: String },

    /// Insufficient stock to complete the sale or delivery.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell (qty: 15)
    ///      │
    ///      ▼
    /// Check stock: available=7
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Chorizo", available: 7, requested: 15 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: Quantity,
        requested: Quantity,
    },

    /// The terminal already has an open drawer.
    #[error("Terminal {terminal_id} already has an open session")]
    TerminalSessionOpen { terminal_id: String },

    /// The operator already has an open drawer on some terminal.
    #[error("Operator {user_id} already has an open session on terminal {terminal_id}")]
    OperatorSessionOpen { user_id: String, terminal_id: String },

    #[error("Cash session {session_id} is not open")]
    SessionNotOpen { session_id: String },

    #[error("Cash session {session_id} is still open; close it first")]
    SessionNotClosed { session_id: String },

    #[error("Cannot delete your current open session {session_id}")]
    SessionInUse { session_id: String },

    #[error("Sale {sale_id} is already cancelled")]
    SaleAlreadyCancelled { sale_id: String },

    /// Cash tendered does not cover a CASH sale.
    #[error("Insufficient cash amount. Required: {required}, received: {received}")]
    InsufficientCash { required: Money, received: Money },

    /// MIXED tender parts do not add up to the total.
    #[error("Payment amounts don't match total. Required: {required}, paid: {paid}")]
    PaymentMismatch { required: Money, paid: Money },

    /// Sale or order discount is larger than its subtotal.
    #[error("Discount {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal { subtotal: Money, discount: Money },

    #[error("Deposit {deposit} cannot exceed order total {total}")]
    DepositExceedsTotal { deposit: Money, total: Money },

    /// Order state machine rejected the transition.
    #[error("Order {order_id} is {status}, cannot {action}")]
    InvalidOrderTransition {
        order_id: String,
        status: OrderStatus,
        action: &'static str,
    },

    #[error("Order {order_id} is already paid by sale {sale_id}")]
    OrderAlreadyPaid { order_id: String, sale_id: String },

    /// Authorization failure.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Maps the error onto the engine-wide taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Forbidden { .. } => ErrorKind::Forbidden,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::ProductInactive { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::TerminalSessionOpen { .. }
            | CoreError::OperatorSessionOpen { .. }
            | CoreError::SessionNotOpen { .. }
            | CoreError::SessionNotClosed { .. }
            | CoreError::SessionInUse { .. }
            | CoreError::SaleAlreadyCancelled { .. }
            | CoreError::InsufficientCash { .. }
            | CoreError::PaymentMismatch { .. }
            | CoreError::DiscountExceedsSubtotal { .. }
            | CoreError::DepositExceedsTotal { .. }
            | CoreError::InvalidOrderTransition { .. }
            | CoreError::OrderAlreadyPaid { .. } => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements and are raised
/// before a transaction is opened.
#[derive(Debug, Error)]
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

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid time).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Chorizo".to_string(),
            available: Quantity::from_units(7),
            requested: Quantity::from_units(15),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Chorizo: available 7, requested 15"
        );

        let err = CoreError::PaymentMismatch {
            required: Money::from_cents(27500),
            paid: Money::from_cents(27400),
        };
        assert_eq!(
            err.to_string(),
            "Payment amounts don't match total. Required: $275.00, paid: $274.00"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CoreError::not_found("Sale", "x").kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::forbidden("no").kind(), ErrorKind::Forbidden);
        assert_eq!(
            CoreError::SaleAlreadyCancelled {
                sale_id: "s".to_string()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert!(!ErrorKind::Conflict.is_retryable());
        assert!(ErrorKind::Concurrency.is_retryable());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
