//! Evaluated holdings as reported by the broker's position sync.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{DomainError, Money, Quantity, Symbol};

/// A long holding with its valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedPosition {
    symbol: Symbol,
    quantity: Quantity,
    average_price: Decimal,
    unrealized_pnl: Money,
}

impl EvaluatedPosition {
    /// Create an evaluated position.
    ///
    /// # Errors
    ///
    /// Returns error if the quantity is not positive or the average price is negative.
    pub fn new(
        symbol: Symbol,
        quantity: Quantity,
        average_price: Decimal,
        unrealized_pnl: Money,
    ) -> Result<Self, DomainError> {
        if !quantity.is_positive() {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: format!("Position {symbol} must be long, got {quantity}"),
            });
        }
        if average_price.is_sign_negative() {
            return Err(DomainError::InvalidValue {
                field: "average_price".to_string(),
                message: format!("Position {symbol} has negative average price"),
            });
        }
        Ok(Self {
            symbol,
            quantity,
            average_price,
            unrealized_pnl,
        })
    }

    /// Instrument symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Shares held.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Average cost per share.
    #[must_use]
    pub const fn average_price(&self) -> Decimal {
        self.average_price
    }

    /// Unrealized profit or loss across the whole holding.
    #[must_use]
    pub const fn unrealized_pnl(&self) -> Money {
        self.unrealized_pnl
    }

    /// Current per-share mark implied by cost basis and unrealized PnL.
    ///
    /// `None` when the figures reported for the holding overflow.
    #[must_use]
    pub fn mark_price(&self) -> Option<Decimal> {
        self.unrealized_pnl
            .amount()
            .checked_div(self.quantity.amount())?
            .checked_add(self.average_price)
    }
}
