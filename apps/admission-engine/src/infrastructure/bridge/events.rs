//! Broker callback messages.

use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::application::services::OrderFill;
use crate::domain::capital::EvaluatedPosition;
use crate::domain::shared::{BrokerOrderId, Symbol};

/// A broker callback, handed off from the broker's thread to the bridge task.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    /// One account summary value.
    AccountValue {
        /// Broker tag name.
        tag: String,
        /// Raw value as sent by the broker.
        value: String,
    },
    /// End of an account summary batch.
    AccountSummaryEnd,
    /// One row of a position snapshot.
    Position(EvaluatedPosition),
    /// End of a position snapshot.
    PositionEnd,
    /// An order was filled.
    OrderFilled(OrderFill),
    /// An order was rejected.
    OrderRejected {
        /// Rejected order.
        broker_order_id: BrokerOrderId,
        /// Broker error code.
        code: i32,
        /// Broker message.
        message: String,
    },
    /// Snapshot of every order the broker still has open.
    OpenOrders(Vec<BrokerOrderId>),
    /// A price update.
    Quote {
        /// Instrument.
        symbol: Symbol,
        /// Last price.
        price: Decimal,
    },
}

/// Sending half used by broker adapters.
pub type BrokerEventSender = mpsc::Sender<BrokerEvent>;

/// Receiving half consumed by the bridge.
pub type BrokerEventReceiver = mpsc::Receiver<BrokerEvent>;

/// Create the bounded broker event channel.
#[must_use]
pub fn channel(capacity: usize) -> (BrokerEventSender, BrokerEventReceiver) {
    mpsc::channel(capacity.max(1))
}
