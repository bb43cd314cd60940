//! Immutable capital snapshot read per admission decision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Money;

/// Capital metrics at a point in time.
///
/// All monetary fields are non-negative except `cash`, which goes negative
/// when the account is borrowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalSnapshot {
    /// Currency available to open new positions.
    pub buying_power: Money,
    /// Total account equity.
    pub net_liquidation_value: Money,
    /// Cash balance (may be negative).
    pub cash: Money,
    /// Margin cushion above maintenance.
    pub excess_liquidity: Money,
    /// Share of equity still free of margin, in [0, 1].
    pub reserve_margin_fraction: Decimal,
}

impl CapitalSnapshot {
    /// Create a snapshot, clamping monetary fields other than cash at zero.
    #[must_use]
    pub fn new(
        buying_power: Money,
        net_liquidation_value: Money,
        cash: Money,
        excess_liquidity: Money,
        reserve_margin_fraction: Decimal,
    ) -> Self {
        Self {
            buying_power: buying_power.non_negative(),
            net_liquidation_value: net_liquidation_value.non_negative(),
            cash,
            excess_liquidity: excess_liquidity.non_negative(),
            reserve_margin_fraction: clamp_fraction(reserve_margin_fraction),
        }
    }

    /// An empty account: no capital, no margin cushion.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            buying_power: Money::ZERO,
            net_liquidation_value: Money::ZERO,
            cash: Money::ZERO,
            excess_liquidity: Money::ZERO,
            reserve_margin_fraction: Decimal::ZERO,
        }
    }

    /// Reserve fraction implied by excess liquidity over net liquidation value.
    ///
    /// Zero when net liquidation value is not positive.
    #[must_use]
    pub fn derive_reserve_fraction(excess_liquidity: Money, net_liquidation_value: Money) -> Decimal {
        if !net_liquidation_value.is_positive() {
            return Decimal::ZERO;
        }
        excess_liquidity
            .amount()
            .checked_div(net_liquidation_value.amount())
            .map_or_else(
                || {
                    if excess_liquidity.is_negative() {
                        Decimal::ZERO
                    } else {
                        Decimal::ONE
                    }
                },
                clamp_fraction,
            )
    }

    /// Fraction of equity consumed by margin.
    #[must_use]
    pub fn margin_utilization(&self) -> Decimal {
        Decimal::ONE - self.reserve_margin_fraction
    }

    /// The same snapshot with in-flight notional deducted from buying power.
    #[must_use]
    pub fn net_of_in_flight(mut self, reserved: Money) -> Self {
        self.buying_power = (self.buying_power - reserved).non_negative();
        self
    }
}

impl Default for CapitalSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn clamp_fraction(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE)
}
