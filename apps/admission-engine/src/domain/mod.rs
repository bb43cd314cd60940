//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless admission logic (classification, generation, fragmentation)
//! - **State Machines**: Buy signal lifecycle with copy-on-transition
//!
//! # Bounded Contexts
//!
//! - [`capital`]: Capital snapshot and evaluated holdings
//! - [`liquidity`]: Liquidity mode classification and liquidity generation
//! - [`admission`]: Buy signal lifecycle and fragmentation
//! - [`dispatch`]: Broker-bound orders, in-flight reservations and step-down recovery

pub mod admission;
pub mod capital;
pub mod dispatch;
pub mod liquidity;
pub mod shared;
