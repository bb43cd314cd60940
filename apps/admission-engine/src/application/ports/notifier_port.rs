//! Notifier Port (Driven Port)
//!
//! Outbound notifications to the principal. Calls are fire-and-forget:
//! implementations must not block the caller, and delivery retries belong
//! to the transport behind the port.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::dispatch::OrderSide;
use crate::domain::shared::{BrokerOrderId, Quantity, Symbol, TransactionId};

/// Severity of a liquidity alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    /// Informational.
    Info,
    /// Degraded but operating.
    Warning,
    /// Requires intervention.
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A confirmed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Broker order the fill belongs to.
    pub broker_order_id: BrokerOrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Filled quantity.
    pub quantity: Quantity,
    /// Fill price.
    pub price: Decimal,
    /// Idempotency key of the order, when known.
    pub transaction_id: Option<TransactionId>,
}

/// A rejection that will not be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRejection {
    /// Rejected broker order.
    pub broker_order_id: BrokerOrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Broker error code.
    pub code: i32,
    /// Broker message, or the abandonment reason.
    pub message: String,
}

/// Port for outbound notifications.
#[cfg_attr(test, mockall::automock)]
pub trait NotifierPort: Send + Sync {
    /// An order was filled.
    fn notify_execution_report(&self, report: &ExecutionReport);

    /// An order was rejected for good.
    fn notify_order_rejected(&self, rejection: &OrderRejection);

    /// Liquidity state needs attention.
    fn notify_liquidity_alert(&self, level: AlertLevel, message: &str);
}

/// No-op notifier for testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpNotifier;

impl NotifierPort for NoOpNotifier {
    fn notify_execution_report(&self, _report: &ExecutionReport) {}

    fn notify_order_rejected(&self, _rejection: &OrderRejection) {}

    fn notify_liquidity_alert(&self, _level: AlertLevel, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn no_op_notifier_accepts_everything() {
        let notifier = NoOpNotifier;
        notifier.notify_execution_report(&ExecutionReport {
            broker_order_id: BrokerOrderId::new(1),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            quantity: Quantity::from_u64(10),
            price: dec!(150),
            transaction_id: None,
        });
        notifier.notify_liquidity_alert(AlertLevel::Critical, "test");
    }

    #[test]
    fn alert_level_wire_format() {
        assert_eq!(serde_json::to_string(&AlertLevel::Critical).unwrap(), "\"CRITICAL\"");
        assert_eq!(AlertLevel::Warning.to_string(), "WARNING");
    }
}
