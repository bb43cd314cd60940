//! Orders bound for the broker.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::admission::{BuyFragment, PriceCeiling};
use crate::domain::liquidity::SellOrder;
use crate::domain::shared::{Quantity, Symbol, TransactionId};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Market order.
    Market,
    /// Limit order.
    Limit {
        /// Limit price.
        price: Decimal,
    },
}

impl OrderKind {
    /// The limit price, if any.
    #[must_use]
    pub const fn limit_price(&self) -> Option<Decimal> {
        match self {
            Self::Market => None,
            Self::Limit { price } => Some(*price),
        }
    }
}

impl From<PriceCeiling> for OrderKind {
    fn from(value: PriceCeiling) -> Self {
        match value {
            PriceCeiling::Limit(price) => Self::Limit { price },
            PriceCeiling::Market => Self::Market,
        }
    }
}

/// Where a queued order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOrigin {
    /// Fragment of an admitted buy.
    Fragment,
    /// Liquidity-generation sell.
    LiquidityGeneration,
    /// Submitted directly by the principal, e.g. a step-down resubmission.
    External,
}

/// An order waiting to leave the process.
///
/// The quantity is still a decimal here; conversion to whole shares happens
/// at the dispatch boundary and a fractional value is vetoed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOrder {
    /// Instrument.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Requested quantity.
    pub quantity: Quantity,
    /// Market or limit.
    pub kind: OrderKind,
    /// Idempotency key.
    pub transaction_id: TransactionId,
    /// Producer.
    pub origin: OrderOrigin,
}

impl QueuedOrder {
    /// A buy for an admitted fragment.
    #[must_use]
    pub fn from_fragment(fragment: &BuyFragment) -> Self {
        Self {
            symbol: fragment.symbol.clone(),
            side: OrderSide::Buy,
            quantity: fragment.quantity,
            kind: fragment.price.into(),
            transaction_id: fragment.transaction_id.clone(),
            origin: OrderOrigin::Fragment,
        }
    }

    /// A market sell for a liquidity-generation proposal.
    #[must_use]
    pub fn from_sell(sell: &SellOrder) -> Self {
        Self {
            symbol: sell.symbol.clone(),
            side: OrderSide::Sell,
            quantity: sell.quantity,
            kind: OrderKind::Market,
            transaction_id: sell.transaction_id.clone(),
            origin: OrderOrigin::LiquidityGeneration,
        }
    }
}
