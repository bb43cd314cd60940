//! In-memory quote book fed by broker market data events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::application::ports::ReferencePriceSource;
use crate::domain::shared::Symbol;

#[derive(Debug, Clone, Copy)]
struct LastPrice {
    price: Decimal,
    updated_at: DateTime<Utc>,
}

/// Last traded or quoted price per symbol.
#[derive(Debug, Default)]
pub struct QuoteBook {
    prices: RwLock<HashMap<Symbol, LastPrice>>,
}

impl QuoteBook {
    /// Create an empty quote book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a price. Non-positive prices are discarded.
    pub fn update(&self, symbol: Symbol, price: Decimal) -> bool {
        if price <= Decimal::ZERO {
            tracing::warn!(%symbol, %price, "Discarding non-positive quote");
            return false;
        }
        self.prices.write().insert(
            symbol,
            LastPrice {
                price,
                updated_at: Utc::now(),
            },
        );
        true
    }

    /// When the symbol was last priced.
    pub fn updated_at(&self, symbol: &Symbol) -> Option<DateTime<Utc>> {
        self.prices.read().get(symbol).map(|p| p.updated_at)
    }

    /// Number of priced symbols.
    pub fn len(&self) -> usize {
        self.prices.read().len()
    }

    /// Returns true if nothing is priced.
    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }
}

impl ReferencePriceSource for QuoteBook {
    fn reference_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.read().get(symbol).map(|p| p.price)
    }
}
