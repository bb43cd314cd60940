//! Fragmentation of an approved buy into child orders.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{Money, Quantity, SignalId, Symbol, TransactionId};

/// Price constraint on a buy.
///
/// Absence of a price is explicit: it is never encoded as a zero price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "price", rename_all = "snake_case")]
pub enum PriceCeiling {
    /// Do not pay more than this per share.
    Limit(Decimal),
    /// Take the market.
    Market,
}

impl PriceCeiling {
    /// The ceiling, if one was supplied.
    #[must_use]
    pub const fn limit(&self) -> Option<Decimal> {
        match self {
            Self::Limit(price) => Some(*price),
            Self::Market => None,
        }
    }
}

/// One child order of an admitted buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyFragment {
    /// Instrument.
    pub symbol: Symbol,
    /// Share of the approved notional.
    pub cost_share: Money,
    /// Whole shares affordable with `cost_share`.
    pub quantity: Quantity,
    /// Price constraint carried from the signal.
    pub price: PriceCeiling,
    /// Idempotency key.
    pub transaction_id: TransactionId,
}

/// Strategy splitting an approved notional into fragment costs.
pub trait FragmentationPolicy: Send + Sync {
    /// Split `total` into non-negative shares summing to `total`.
    fn split(&self, total: Money) -> Vec<Money>;
}

/// Equal shares rounded half-up to cents; the last share absorbs the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualSplit {
    parts: usize,
}

impl EqualSplit {
    /// Split into `parts` shares (at least one).
    #[must_use]
    pub fn new(parts: usize) -> Self {
        Self { parts: parts.max(1) }
    }

    /// Number of shares produced.
    #[must_use]
    pub const fn parts(&self) -> usize {
        self.parts
    }
}

impl Default for EqualSplit {
    fn default() -> Self {
        Self::new(3)
    }
}

impl FragmentationPolicy for EqualSplit {
    fn split(&self, total: Money) -> Vec<Money> {
        if !total.is_positive() {
            return vec![Money::ZERO; self.parts];
        }
        let leading = Decimal::from(self.parts - 1);
        let exact = Money::new(total.amount() / Decimal::from(self.parts));

        let mut share = exact.round_half_up();
        // Rounding up on tiny totals could push the last share below zero.
        if share * leading > total {
            share = exact.round_down();
        }
        let last = total - share * leading;

        let mut shares = vec![share; self.parts - 1];
        shares.push(last);
        shares
    }
}

/// Build fragments for an approved notional, sized at `price_per_share`.
///
/// Fragments that cannot buy a whole share are dropped.
#[must_use]
pub fn build_fragments(
    signal_id: &SignalId,
    symbol: &Symbol,
    price: PriceCeiling,
    approved: Money,
    price_per_share: Decimal,
    policy: &dyn FragmentationPolicy,
) -> Vec<BuyFragment> {
    if price_per_share <= Decimal::ZERO {
        return Vec::new();
    }
    policy
        .split(approved)
        .into_iter()
        .enumerate()
        .filter_map(|(index, cost_share)| {
            let quantity = Quantity::new(cost_share.amount().checked_div(price_per_share)?).round_down();
            if !quantity.is_positive() {
                return None;
            }
            Some(BuyFragment {
                symbol: symbol.clone(),
                cost_share,
                quantity,
                price,
                transaction_id: TransactionId::new(format!("{signal_id}-frag-{}", index + 1)),
            })
        })
        .collect()
}
