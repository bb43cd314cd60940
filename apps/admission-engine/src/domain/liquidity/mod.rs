//! Liquidity Bounded Context
//!
//! - [`classifier`]: maps capital metrics and a candidate cost to a liquidity mode
//! - [`generator`]: proposes a bounded sell of a profitable holding to free buying power

pub mod classifier;
pub mod generator;

pub use classifier::{Classification, LiquidityClassifier, LiquidityMode, LiquidityPolicy, ModeFractions};
pub use generator::{GenerationOutcome, GeneratorPolicy, LiquidityGenerator, NoLiquidityReason, SellOrder};
