//! Notifier Adapters
//!
//! Implementations of `NotifierPort`.

mod channel_notifier;
mod tracing_notifier;

pub use channel_notifier::{ChannelNotifier, Notification};
pub use tracing_notifier::TracingNotifier;
