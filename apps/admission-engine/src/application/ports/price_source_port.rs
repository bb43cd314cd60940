//! Reference Price Port (Driven Port)
//!
//! Latest usable price for an instrument, read synchronously on the
//! dispatch and fragmentation paths.

use rust_decimal::Decimal;

use crate::domain::shared::Symbol;

/// Source of live reference prices.
pub trait ReferencePriceSource: Send + Sync {
    /// Latest price, or `None` when there is no usable quote.
    ///
    /// Implementations never return a non-positive price.
    fn reference_price(&self, symbol: &Symbol) -> Option<Decimal>;
}

/// Price source with no data; every lookup falls back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPriceSource;

impl ReferencePriceSource for NoPriceSource {
    fn reference_price(&self, _symbol: &Symbol) -> Option<Decimal> {
        None
    }
}
