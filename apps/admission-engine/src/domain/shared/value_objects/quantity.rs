//! Quantity value object for share counts.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Mul;

use crate::domain::shared::DomainError;

/// A quantity of shares.
///
/// Represented as a Decimal so that upstream sizing can produce fractional
/// values; only whole units ever reach the broker (see [`Quantity::whole_units`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Quantity from a whole share count.
    #[must_use]
    pub fn from_u64(amount: u64) -> Self {
        Self(Decimal::from(amount))
    }

    /// Zero quantity.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this quantity is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round down to whole units.
    #[must_use]
    pub fn round_down(&self) -> Self {
        Self(self.0.floor())
    }

    /// Convert to an exact whole share count.
    ///
    /// This is a veto, not a rounding step: any fractional part is an error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for non-positive quantities and
    /// `NonIntegralQuantity` when the value has a fractional part.
    pub fn whole_units(&self) -> Result<u64, DomainError> {
        if self.0 <= Decimal::ZERO {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: format!("Order quantity must be positive, got {}", self.0),
            });
        }
        if !self.0.fract().is_zero() {
            return Err(DomainError::NonIntegralQuantity {
                quantity: self.0.to_string(),
            });
        }
        self.0.to_u64().ok_or_else(|| DomainError::InvalidValue {
            field: "quantity".to_string(),
            message: format!("Order quantity {} is out of range", self.0),
        })
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract().is_zero() {
            write!(f, "{}", self.0.trunc())
        } else {
            write!(f, "{:.6}", self.0)
        }
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Mul<Decimal> for Quantity {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Self::Output {
        self.0 * rhs
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}
