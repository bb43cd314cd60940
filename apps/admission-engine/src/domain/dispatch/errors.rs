//! Dispatch errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::shared::{BrokerOrderId, DomainError, Symbol};

/// Failure on the dispatch path.
///
/// `Transport` and margin rejections are distinct: a transport failure is
/// never answered with a step-down.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Pre-flight margin veto; nothing was reserved or sent.
    #[error("Margin utilization {utilization} exceeds veto threshold {threshold}")]
    Vetoed {
        /// Observed utilization.
        utilization: Decimal,
        /// Configured threshold.
        threshold: Decimal,
    },

    /// Quantity is not a positive whole number of shares.
    #[error("Invalid quantity for {symbol}: {source}")]
    InvalidQuantity {
        /// Instrument.
        symbol: Symbol,
        /// Underlying validation error.
        #[source]
        source: DomainError,
    },

    /// No usable reference price to value the reservation.
    #[error("No reference price for {symbol}")]
    NoReferencePrice {
        /// Instrument.
        symbol: Symbol,
    },

    /// The broker call failed; the reservation was rolled back.
    #[error("Broker submission of order {broker_order_id} failed: {message}")]
    Transport {
        /// Identifier the order was sent under.
        broker_order_id: BrokerOrderId,
        /// Error details.
        message: String,
    },

    /// Reservation bookkeeping refused the order.
    #[error("Reservation invariant violated: {0}")]
    Reservation(DomainError),

    /// The order queue is at capacity.
    #[error("Order queue is full")]
    QueueFull,

    /// The order queue consumer has stopped.
    #[error("Order queue is closed")]
    QueueClosed,
}

impl DispatchError {
    /// Returns true for the pre-flight margin veto.
    #[must_use]
    pub const fn is_veto(&self) -> bool {
        matches!(self, Self::Vetoed { .. })
    }
}
