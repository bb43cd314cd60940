//! Account summary tags understood by the capital cache.

use std::fmt;

/// A capital metric the cache keeps a field for.
///
/// Every other tag the broker pushes is logged and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountTag {
    /// Currency available to open new positions.
    BuyingPower,
    /// Total account equity.
    NetLiquidation,
    /// Settled plus unsettled cash; negative when borrowing.
    TotalCashValue,
    /// Margin cushion above the maintenance requirement.
    ExcessLiquidity,
    /// Market value of all positions.
    GrossPositionValue,
}

impl AccountTag {
    /// Parse the broker's tag name.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "BuyingPower" => Some(Self::BuyingPower),
            "NetLiquidation" => Some(Self::NetLiquidation),
            "TotalCashValue" => Some(Self::TotalCashValue),
            "ExcessLiquidity" => Some(Self::ExcessLiquidity),
            "GrossPositionValue" => Some(Self::GrossPositionValue),
            _ => None,
        }
    }

    /// The broker's tag name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuyingPower => "BuyingPower",
            Self::NetLiquidation => "NetLiquidation",
            Self::TotalCashValue => "TotalCashValue",
            Self::ExcessLiquidity => "ExcessLiquidity",
            Self::GrossPositionValue => "GrossPositionValue",
        }
    }
}

impl fmt::Display for AccountTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
