//! Liquidity Mode Classifier
//!
//! Pure mapping from a capital snapshot and a candidate cost to one of four
//! liquidity modes. Rules are evaluated in strict priority order, first
//! match wins:
//!
//! 1. reserve margin fraction below the minimum: `Emergency`
//! 2. buying power covers less than `safe_mode_ratio` of the cost: `SafeMode`
//! 3. negative cash: `Recovery`
//! 4. otherwise: `HighLiquidity`

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::capital::CapitalSnapshot;
use crate::domain::shared::Money;

/// Account liquidity regime for a single admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiquidityMode {
    /// Margin cushion below the configured floor.
    Emergency,
    /// Buying power does not cover the candidate cost.
    SafeMode,
    /// Cash balance is negative.
    Recovery,
    /// No constraint applies.
    HighLiquidity,
}

impl fmt::Display for LiquidityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Emergency => "EMERGENCY",
            Self::SafeMode => "SAFE_MODE",
            Self::Recovery => "RECOVERY",
            Self::HighLiquidity => "HIGH_LIQUIDITY",
        };
        f.write_str(name)
    }
}

/// Usable share of buying power for each mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeFractions {
    /// Fraction usable in `Emergency`.
    pub emergency: Decimal,
    /// Fraction usable in `SafeMode`.
    pub safe_mode: Decimal,
    /// Fraction usable in `Recovery`.
    pub recovery: Decimal,
    /// Per-order cap in `HighLiquidity`.
    pub high_liquidity: Decimal,
}

impl Default for ModeFractions {
    fn default() -> Self {
        Self {
            emergency: dec!(0.05),
            safe_mode: dec!(0.15),
            recovery: dec!(0.10),
            high_liquidity: dec!(0.90),
        }
    }
}

impl ModeFractions {
    /// Fraction for a mode.
    #[must_use]
    pub const fn for_mode(&self, mode: LiquidityMode) -> Decimal {
        match mode {
            LiquidityMode::Emergency => self.emergency,
            LiquidityMode::SafeMode => self.safe_mode,
            LiquidityMode::Recovery => self.recovery,
            LiquidityMode::HighLiquidity => self.high_liquidity,
        }
    }
}

/// Thresholds driving classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityPolicy {
    /// Below this reserve margin fraction the account is in `Emergency`.
    pub min_reserve_margin_fraction: Decimal,
    /// Below this buying-power-to-cost ratio the account is in `SafeMode`.
    pub safe_mode_ratio: Decimal,
    /// Usable buying power per mode.
    pub fractions: ModeFractions,
}

impl Default for LiquidityPolicy {
    fn default() -> Self {
        Self {
            min_reserve_margin_fraction: dec!(0.10),
            safe_mode_ratio: Decimal::ONE,
            fractions: ModeFractions::default(),
        }
    }
}

/// Result of classifying a snapshot against a candidate cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Selected mode.
    pub mode: LiquidityMode,
    /// Usable fraction for the mode.
    pub fraction: Decimal,
    /// `buying_power x fraction`.
    pub usable_buying_power: Money,
}

impl Classification {
    /// Whether the usable buying power covers `cost`.
    #[must_use]
    pub fn covers(&self, cost: Money) -> bool {
        self.usable_buying_power >= cost
    }
}

/// Deterministic liquidity classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidityClassifier {
    policy: LiquidityPolicy,
}

impl LiquidityClassifier {
    /// Create a classifier for a policy.
    #[must_use]
    pub const fn new(policy: LiquidityPolicy) -> Self {
        Self { policy }
    }

    /// The policy in force.
    #[must_use]
    pub const fn policy(&self) -> &LiquidityPolicy {
        &self.policy
    }

    /// Select the liquidity mode for a candidate cost.
    #[must_use]
    pub fn mode(&self, snapshot: &CapitalSnapshot, candidate_cost: Money) -> LiquidityMode {
        if snapshot.reserve_margin_fraction < self.policy.min_reserve_margin_fraction {
            return LiquidityMode::Emergency;
        }
        if candidate_cost.is_positive() && self.below_safe_ratio(snapshot.buying_power, candidate_cost) {
            return LiquidityMode::SafeMode;
        }
        if snapshot.cash.is_negative() {
            return LiquidityMode::Recovery;
        }
        LiquidityMode::HighLiquidity
    }

    /// `buying_power / cost < safe_mode_ratio`, evaluated without division.
    ///
    /// A product too large for `Decimal` exceeds any buying power.
    fn below_safe_ratio(&self, buying_power: Money, cost: Money) -> bool {
        cost.amount()
            .checked_mul(self.policy.safe_mode_ratio)
            .is_none_or(|threshold| buying_power.amount() < threshold)
    }

    /// Classify and compute usable buying power.
    #[must_use]
    pub fn classify(&self, snapshot: &CapitalSnapshot, candidate_cost: Money) -> Classification {
        let mode = self.mode(snapshot, candidate_cost);
        let fraction = self.policy.fractions.for_mode(mode);
        Classification {
            mode,
            fraction,
            usable_buying_power: snapshot.buying_power * fraction,
        }
    }
}
