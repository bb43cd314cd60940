//! Domain errors for the admission engine.

use std::fmt;

/// Domain-level errors that can occur in business logic.
///
/// These errors are independent of infrastructure concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid state transition attempted.
    InvalidStateTransition {
        /// Entity type (e.g., "BuySignal").
        entity: String,
        /// Current state.
        from: String,
        /// Attempted state.
        to: String,
    },

    /// Invalid value for a field.
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// A quantity that cannot be expressed in whole units.
    NonIntegralQuantity {
        /// The offending quantity, as received.
        quantity: String,
    },

    /// Invariant violated by an inbound event.
    InvariantViolation {
        /// Entity the event referred to.
        entity: String,
        /// Invariant that was violated.
        invariant: String,
    },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStateTransition { entity, from, to } => {
                write!(f, "Invalid state transition for {entity}: {from} -> {to}")
            }
            Self::InvalidValue { field, message } => {
                write!(f, "Invalid value for '{field}': {message}")
            }
            Self::NonIntegralQuantity { quantity } => {
                write!(f, "Quantity {quantity} is not a whole number of units")
            }
            Self::InvariantViolation { entity, invariant } => {
                write!(f, "Invariant violation in {entity}: {invariant}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
