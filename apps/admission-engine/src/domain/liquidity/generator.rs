//! Liquidity Generation
//!
//! Selects the most profitable holding and sizes a bounded sell to free the
//! required amount of buying power. Pure selection logic, no I/O.
//!
//! The required amount is a currency amount. It is converted to shares at
//! the position's mark price, rounding up, and capped by
//! `floor(quantity x max_sell_fraction)`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::domain::capital::EvaluatedPosition;
use crate::domain::shared::{Money, Quantity, Symbol, TransactionId};

/// Bounds on how much of a single holding may be sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorPolicy {
    /// Largest share of a holding sold in one generation round.
    pub max_sell_fraction: Decimal,
}

impl Default for GeneratorPolicy {
    fn default() -> Self {
        Self {
            max_sell_fraction: dec!(0.25),
        }
    }
}

/// A liquidity-generation sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellOrder {
    /// Holding being trimmed.
    pub symbol: Symbol,
    /// Whole shares to sell.
    pub quantity: Quantity,
    /// Mark price used for sizing.
    pub reference_price: Decimal,
    /// Human-readable reason, carried into logs and notifications.
    pub reason: String,
    /// Idempotency key.
    pub transaction_id: TransactionId,
}

/// Why no sell could be proposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoLiquidityReason {
    /// Nothing to generate.
    NothingRequired,
    /// No long position carries an unrealized gain.
    NoProfitablePosition,
    /// The best candidate cannot yield a single share under the sell cap.
    BelowOneShare {
        /// Best-ranked holding.
        symbol: Symbol,
    },
    /// The best candidate has no usable mark price.
    Unpriced {
        /// Best-ranked holding.
        symbol: Symbol,
    },
}

impl fmt::Display for NoLiquidityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingRequired => write!(f, "no liquidity required"),
            Self::NoProfitablePosition => write!(f, "no profitable position to trim"),
            Self::BelowOneShare { symbol } => {
                write!(f, "sell cap on {symbol} is below one share")
            }
            Self::Unpriced { symbol } => write!(f, "no usable mark price for {symbol}"),
        }
    }
}

/// Outcome of a generation request.
///
/// `NoLiquidity` is a normal negative outcome, not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Sell this to free liquidity.
    Sell(SellOrder),
    /// No eligible source.
    NoLiquidity(NoLiquidityReason),
}

/// Proposes liquidity-generation sells.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidityGenerator {
    policy: GeneratorPolicy,
}

impl LiquidityGenerator {
    /// Create a generator for a policy.
    #[must_use]
    pub const fn new(policy: GeneratorPolicy) -> Self {
        Self { policy }
    }

    /// Propose a sell freeing at least `required`, bounded by the sell cap.
    #[must_use]
    pub fn propose(
        &self,
        required: Money,
        positions: &[EvaluatedPosition],
        transaction_id: TransactionId,
    ) -> GenerationOutcome {
        if !required.is_positive() {
            return GenerationOutcome::NoLiquidity(NoLiquidityReason::NothingRequired);
        }

        let Some(best) = Self::rank(positions).into_iter().next() else {
            return GenerationOutcome::NoLiquidity(NoLiquidityReason::NoProfitablePosition);
        };

        let Some(mark) = best.mark_price().filter(|m| *m > Decimal::ZERO) else {
            return GenerationOutcome::NoLiquidity(NoLiquidityReason::Unpriced {
                symbol: best.symbol().clone(),
            });
        };
        let max_sellable = (best.quantity().amount() * self.policy.max_sell_fraction).floor();
        // An overflowing share count is capped like any other oversized need.
        let sell = required
            .amount()
            .checked_div(mark)
            .map_or(max_sellable, |needed| needed.ceil().min(max_sellable));

        if sell < Decimal::ONE {
            return GenerationOutcome::NoLiquidity(NoLiquidityReason::BelowOneShare {
                symbol: best.symbol().clone(),
            });
        }

        GenerationOutcome::Sell(SellOrder {
            symbol: best.symbol().clone(),
            quantity: Quantity::new(sell),
            reference_price: mark,
            reason: format!(
                "free {required} of buying power from {} (unrealized {})",
                best.symbol(),
                best.unrealized_pnl()
            ),
            transaction_id,
        })
    }

    /// Profitable long positions, best first; ties broken by symbol.
    #[must_use]
    pub fn rank(positions: &[EvaluatedPosition]) -> Vec<&EvaluatedPosition> {
        let mut eligible: Vec<&EvaluatedPosition> = positions
            .iter()
            .filter(|p| p.unrealized_pnl().is_positive() && p.quantity().is_positive())
            .collect();
        eligible.sort_by(|a, b| match b.unrealized_pnl().cmp(&a.unrealized_pnl()) {
            Ordering::Equal => a.symbol().cmp(b.symbol()),
            other => other,
        });
        eligible
    }
}
