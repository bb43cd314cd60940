//! Capital Bounded Context
//!
//! Account capital metrics and evaluated holdings as reported by the broker.

mod account_tag;
mod position;
mod snapshot;

pub use account_tag::AccountTag;
pub use position::EvaluatedPosition;
pub use snapshot::CapitalSnapshot;
