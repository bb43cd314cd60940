//! Broker Port (Driven Port)
//!
//! The single outward call that places an order. Everything the broker
//! reports back arrives asynchronously as events, not as a return value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::dispatch::{OrderKind, OrderSide, QueuedOrder};
use crate::domain::shared::{BrokerOrderId, Symbol, TransactionId};

/// Contract reference for an equity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Ticker.
    pub symbol: Symbol,
    /// Security type.
    pub sec_type: String,
    /// Routing exchange.
    pub exchange: String,
    /// Currency.
    pub currency: String,
}

impl Contract {
    /// A smart-routed USD stock contract.
    #[must_use]
    pub fn stock(symbol: Symbol) -> Self {
        Self {
            symbol,
            sec_type: "STK".to_string(),
            exchange: "SMART".to_string(),
            currency: "USD".to_string(),
        }
    }
}

/// Order details as sent to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Buy or sell.
    pub action: OrderSide,
    /// Whole shares.
    pub total_quantity: u64,
    /// Market or limit.
    pub kind: OrderKind,
    /// Idempotency key, sent as the order reference.
    pub order_ref: TransactionId,
}

impl OrderSpec {
    /// Spec for a queued order at a vetted whole-share size.
    #[must_use]
    pub fn for_order(order: &QueuedOrder, total_quantity: u64) -> Self {
        Self {
            action: order.side,
            total_quantity,
            kind: order.kind,
            order_ref: order.transaction_id.clone(),
        }
    }
}

/// Broker port error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    /// Connection error.
    #[error("Broker connection error: {message}")]
    ConnectionError {
        /// Error details.
        message: String,
    },

    /// The broker refused the request synchronously.
    #[error("Broker refused order {order_id}: {message}")]
    Refused {
        /// Order the refusal refers to.
        order_id: BrokerOrderId,
        /// Error details.
        message: String,
    },

    /// Unknown error.
    #[error("Broker error: {message}")]
    Unknown {
        /// Error details.
        message: String,
    },
}

/// Port for broker interactions.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Place an order under a broker-facing identifier.
    ///
    /// Success means the order was handed over, not that it was accepted;
    /// acceptance, fills and rejections arrive later as events.
    async fn submit_order(
        &self,
        order_id: BrokerOrderId,
        contract: &Contract,
        spec: &OrderSpec,
    ) -> Result<(), BrokerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dispatch::OrderOrigin;
    use crate::domain::shared::Quantity;
    use rust_decimal_macros::dec;

    #[test]
    fn stock_contract_defaults() {
        let contract = Contract::stock(Symbol::new("aapl"));
        assert_eq!(contract.symbol.as_str(), "AAPL");
        assert_eq!(contract.sec_type, "STK");
        assert_eq!(contract.exchange, "SMART");
    }

    #[test]
    fn order_spec_carries_order_fields() {
        let order = QueuedOrder {
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            quantity: Quantity::from_u64(22),
            kind: OrderKind::Limit { price: dec!(150) },
            transaction_id: TransactionId::new("sig-1-frag-1"),
            origin: OrderOrigin::Fragment,
        };

        let spec = OrderSpec::for_order(&order, 22);
        assert_eq!(spec.action, OrderSide::Buy);
        assert_eq!(spec.total_quantity, 22);
        assert_eq!(spec.kind.limit_price(), Some(dec!(150)));
        assert_eq!(spec.order_ref, TransactionId::new("sig-1-frag-1"));
    }

    #[test]
    fn broker_error_display() {
        let err = BrokerError::ConnectionError {
            message: "socket closed".to_string(),
        };
        assert_eq!(err.to_string(), "Broker connection error: socket closed");
    }
}
