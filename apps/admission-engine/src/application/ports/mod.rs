//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Broker**: the outward order-placement call
//! - **Notifier**: fire-and-forget notifications to the principal
//! - **Reference price**: live prices for sizing and reservations

mod broker_port;
mod notifier_port;
mod price_source_port;

pub use broker_port::{BrokerError, BrokerPort, Contract, OrderSpec};
#[cfg(test)]
pub use notifier_port::MockNotifierPort;
pub use notifier_port::{AlertLevel, ExecutionReport, NoOpNotifier, NotifierPort, OrderRejection};
pub use price_source_port::{NoPriceSource, ReferencePriceSource};
