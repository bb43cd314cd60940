//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application layer. Following hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**: Implement ports for external systems
//!   - `broker/`: Paper broker
//!   - `notify/`: Log and channel notifiers
//!   - `price_feed/`: Quote book fed by broker market data
//!
//! - **Driver Adapters (Inbound)**: Feed the application from outside
//!   - `bridge/`: Broker callback handoff
//!   - `intake/`: JSON-lines buy signals
//!
//! - **Wiring**
//!   - `config/`: Dependency injection container

pub mod bridge;
pub mod broker;
pub mod config;
pub mod intake;
pub mod notify;
pub mod price_feed;
