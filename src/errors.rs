//! Unified error type for the settlement engine.
//!
//! Every command either fully succeeds or returns one of these variants with
//! all participating records left untouched.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced record does not exist.
    #[error("{kind} {id} not found")]
    EntityNotFound {
        /// Record kind (e.g. `"menu_item"`, `"bill"`)
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A stock reservation would drive an inventoried item below zero.
    #[error("Insufficient stock for menu item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Menu item that ran short
        item_id: i64,
        /// Quantity the cart asked for
        requested: i32,
        /// Quantity on hand when the reservation was attempted
        available: i64,
    },

    /// The menu item is switched off and cannot be sold.
    #[error("Menu item {item_id} is not available")]
    ItemUnavailable {
        /// Menu item that is unavailable
        item_id: i64,
    },

    /// Items cannot be added to (or removed from) an order that left `open`.
    #[error("Order {order_id} is {status} and no longer accepts changes")]
    OrderClosed {
        /// Order that was targeted
        order_id: i64,
        /// Status the order is in
        status: String,
    },

    /// Cash handed over does not cover the amount due.
    #[error("Insufficient payment: required {required:.2}, received {received:.2}")]
    InsufficientPayment {
        /// Amount due on the bill
        required: f64,
        /// Amount tendered
        received: f64,
    },

    /// The bill is already paid and is immutable.
    #[error("Bill {bill_id} is already settled")]
    BillAlreadySettled {
        /// Bill that was targeted
        bill_id: i64,
    },

    /// A booking already has an unpaid bill outstanding.
    #[error("Booking {booking_id} already has an open bill ({bill_number})")]
    BillAlreadyIssued {
        /// Booking that was targeted
        booking_id: i64,
        /// Number of the outstanding bill
        bill_number: String,
    },

    /// The booking is not in a state that accepts this command.
    #[error("Booking {booking_id} is {status}")]
    BookingNotActive {
        /// Booking that was targeted
        booking_id: i64,
        /// Status the booking is in
        status: String,
    },

    /// A state machine refused a transition.
    #[error("Cannot {action} {kind} {id} while it is {from}")]
    InvalidTransition {
        /// Record kind
        kind: &'static str,
        /// Record identifier
        id: i64,
        /// Current state
        from: String,
        /// Attempted action
        action: &'static str,
    },

    /// Quantities must be strictly positive.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// Rejected quantity
        quantity: i32,
    },

    /// Money amounts and percentages must be finite (and usually non-negative).
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Rejected amount
        amount: f64,
    },

    /// A commit was attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A bill was requested for an order with no items.
    #[error("Order {order_id} has no items to bill")]
    EmptyOrder {
        /// Order that was targeted
        order_id: i64,
    },

    /// The operation kept colliding with concurrent writers and gave up.
    #[error("{operation} conflicted with concurrent updates after {attempts} attempts, try again")]
    TransactionConflict {
        /// Command that was running
        operation: &'static str,
        /// Number of attempts made
        attempts: u32,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying store error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// I/O error (config files, data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::EntityNotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether retrying the whole atomic operation may succeed.
    ///
    /// Unique-constraint violations (two writers racing for the same open
    /// order or bill number) and a busy/locked store both qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransactionConflict { .. } => true,
            Self::Database(err) => {
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    return true;
                }
                let message = err.to_string().to_lowercase();
                message.contains("unique constraint")
                    || message.contains("database is locked")
                    || message.contains("busy")
            }
            _ => false,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        let err = Error::TransactionConflict {
            operation: "commit_order_items",
            attempts: 3,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_locked_database_is_retryable() {
        let err = Error::Database(DbErr::Custom("database is locked".to_string()));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_validation_errors_are_not_retryable() {
        assert!(!Error::EmptyCart.is_retryable());
        assert!(
            !Error::InsufficientStock {
                item_id: 1,
                requested: 3,
                available: 2,
            }
            .is_retryable()
        );
        assert!(!Error::Database(DbErr::Custom("syntax error".to_string())).is_retryable());
    }

    #[test]
    fn test_insufficient_payment_message() {
        let err = Error::InsufficientPayment {
            required: 900.0,
            received: 899.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient payment: required 900.00, received 899.00"
        );
    }
}
