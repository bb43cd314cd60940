//! Application Services
//!
//! Shared stateful components behind the use cases. The cache and gateway
//! are called from several producers at once; the dispatch loop runs as a
//! background task.

mod account_state_cache;
mod dispatch_gateway;
mod order_queue;

pub use account_state_cache::AccountStateCache;
pub use dispatch_gateway::{DispatchGateway, DispatchPolicy, DispatchReceipt, OrderFill, RecoveryDirective};
pub use order_queue::{
    DispatchLoopStats, OrderDispatchLoop, OrderQueueReceiver, QueuePolicy, SerializedOrderQueue,
};
