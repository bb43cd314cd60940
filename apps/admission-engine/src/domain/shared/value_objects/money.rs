//! Money value object for currency amounts.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use crate::domain::shared::DomainError;

/// A monetary amount in the account's base currency.
///
/// Represented as a Decimal for precise financial calculations.
/// Always uses 2 decimal places for display (but internal precision is higher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Create a new Money value from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this amount is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if this amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Smallest amount accepted for an order.
    pub const MIN_ORDER: Self = Self(Decimal::from_parts(1, 0, 0, false, 2));

    /// Largest amount accepted for an order.
    pub const MAX_ORDER: Self = Self(Decimal::from_parts(10_000_000, 0, 0, false, 0));

    /// Validate the amount as the cost of an order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` below one cent or above `MAX_ORDER`.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if *self < Self::MIN_ORDER {
            return Err(DomainError::InvalidValue {
                field: "money".to_string(),
                message: format!("Order amount must be at least {}, got {}", Self::MIN_ORDER, self.0),
            });
        }
        if *self > Self::MAX_ORDER {
            return Err(DomainError::InvalidValue {
                field: "money".to_string(),
                message: format!("Order amount exceeds maximum: {}", Self::MAX_ORDER),
            });
        }
        Ok(())
    }

    /// Round to cents, half away from zero.
    #[must_use]
    pub fn round_half_up(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Truncate to cents.
    #[must_use]
    pub fn round_down(&self) -> Self {
        Self(self.0.round_dp_with_strategy(2, RoundingStrategy::ToZero))
    }

    /// Clamp negative amounts to zero.
    #[must_use]
    pub fn non_negative(self) -> Self {
        if self.is_negative() { Self::ZERO } else { self }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_new_and_display() {
        let m = Money::new(dec!(150.50));
        assert_eq!(format!("{m}"), "$150.50");
    }

    #[test]
    fn money_validate_for_order_bounds() {
        assert_eq!(Money::MIN_ORDER.amount(), dec!(0.01));
        assert_eq!(Money::MAX_ORDER.amount(), dec!(10_000_000));
        assert!(Money::new(dec!(0.01)).validate_for_order().is_ok());
        assert!(Money::new(dec!(10_000_000)).validate_for_order().is_ok());
        assert!(Money::new(dec!(0.009)).validate_for_order().is_err());
        assert!(Money::new(Decimal::new(1, 28)).validate_for_order().is_err());
        assert!(Money::new(dec!(10_000_000.01)).validate_for_order().is_err());
    }

    #[test]
    fn money_zero() {
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
    }

    #[test]
    fn money_round_half_up() {
        assert_eq!(Money::new(dec!(3333.335)).round_half_up().amount(), dec!(3333.34));
        assert_eq!(Money::new(dec!(3333.3333)).round_half_up().amount(), dec!(3333.33));
    }

    #[test]
    fn money_round_down() {
        assert_eq!(Money::new(dec!(0.019)).round_down().amount(), dec!(0.01));
    }

    #[test]
    fn money_non_negative() {
        assert_eq!(Money::new(dec!(-5)).non_negative(), Money::ZERO);
        assert_eq!(Money::new(dec!(5)).non_negative(), Money::new(dec!(5)));
    }

    #[test]
    fn money_arithmetic_and_sum() {
        let a = Money::new(dec!(100));
        let b = Money::new(dec!(50));

        assert_eq!((a + b).amount(), dec!(150));
        assert_eq!((a - b).amount(), dec!(50));
        assert_eq!((-a).amount(), dec!(-100));
        assert_eq!((a * dec!(0.05)).amount(), dec!(5.00));
        assert_eq!([a, b, b].into_iter().sum::<Money>().amount(), dec!(200));
    }

    #[test]
    fn money_ordering() {
        let a = Money::new(dec!(100));
        let b = Money::new(dec!(50));
        assert!(a > b);
        assert!(b < a);
    }

    #[test]
    fn money_serde_roundtrip() {
        let m = Money::new(dec!(150.50));
        let json = serde_json::to_string(&m).unwrap();
        let parsed: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, m);
    }
}
