//! Broker Callback Bridge
//!
//! Channel handoff from broker callbacks into the core's own task.

mod event_bridge;
mod events;

pub use event_bridge::{BridgeStats, BrokerEventBridge};
pub use events::{BrokerEvent, BrokerEventReceiver, BrokerEventSender, channel};
