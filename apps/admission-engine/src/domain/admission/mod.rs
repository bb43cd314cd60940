//! Admission Bounded Context
//!
//! Buy signal lifecycle and the fragmentation of approved amounts into
//! child orders.

pub mod fragmentation;
pub mod signal;

pub use fragmentation::{BuyFragment, EqualSplit, FragmentationPolicy, PriceCeiling, build_fragments};
pub use signal::{BuySignal, SignalState};
