// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Admission Engine - Rust Core Library
//!
//! Capital-aware order admission between a decision engine and a broker.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (value objects, state machines, pure policies)
//!   - `capital`: Capital snapshot, evaluated positions
//!   - `liquidity`: Liquidity classifier, liquidity generator
//!   - `admission`: Buy signal lifecycle, fragmentation
//!   - `dispatch`: Queued orders, in-flight reservations, step-down recovery
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`BrokerPort`, `NotifierPort`)
//!   - `services`: `AccountStateCache`, `DispatchGateway`, `SerializedOrderQueue`
//!   - `use_cases`: `AdmissionOrchestrator`, `OrderFlowManager`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `broker`: Paper broker adapter
//!   - `bridge`: Broker callback handoff
//!   - `intake`: JSON-lines signal intake
//!   - `config`: Dependency injection container

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Configuration loading and validation.
pub mod config;

/// Tracing setup.
pub mod telemetry;

// =============================================================================
// Re-exports from Clean Architecture
// =============================================================================

// Domain re-exports
pub use domain::admission::{BuySignal, SignalState};
pub use domain::capital::{CapitalSnapshot, EvaluatedPosition};
pub use domain::liquidity::{LiquidityClassifier, LiquidityGenerator, LiquidityMode};
pub use domain::shared::{BrokerOrderId, Money, Quantity, SignalId, Symbol};

// Application re-exports
pub use application::ports::{BrokerError, BrokerPort, NotifierPort, ReferencePriceSource};
pub use application::services::{AccountStateCache, DispatchGateway, SerializedOrderQueue};
pub use application::use_cases::{AdmissionOrchestrator, OrderFlowManager};

// Infrastructure re-exports
pub use infrastructure::broker::PaperBroker;
pub use infrastructure::config::Container;
pub use infrastructure::price_feed::QuoteBook;
