//! Step-down recovery after margin rejections.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::shared::Symbol;

/// How orders shrink after a margin rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDownPolicy {
    /// Retained share of the rejected quantity.
    pub factor: Decimal,
    /// Step-downs allowed per symbol before abandoning it.
    pub max_attempts: u32,
}

impl Default for StepDownPolicy {
    fn default() -> Self {
        Self {
            factor: dec!(0.60),
            max_attempts: 2,
        }
    }
}

/// What to do after a margin rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDownOutcome {
    /// Resubmit at the reduced size.
    StepDown {
        /// New target size in whole shares.
        quantity: u64,
        /// Attempt number for this symbol, starting at 1.
        attempt: u32,
    },
    /// Give up on the symbol; its counter has been cleared.
    Abandon {
        /// Attempts recorded when the symbol was abandoned.
        attempts: u32,
    },
}

/// Per-symbol step-down attempt counts.
#[derive(Debug, Default)]
pub struct RecoveryCounter {
    policy: StepDownPolicy,
    attempts: HashMap<Symbol, u32>,
}

impl RecoveryCounter {
    /// Create a counter for a policy.
    #[must_use]
    pub fn new(policy: StepDownPolicy) -> Self {
        Self {
            policy,
            attempts: HashMap::new(),
        }
    }

    /// Record a margin rejection of `rejected_quantity` shares.
    pub fn on_margin_rejection(&mut self, symbol: &Symbol, rejected_quantity: u64) -> StepDownOutcome {
        let attempt = self.attempts(symbol) + 1;
        let reduced = (Decimal::from(rejected_quantity) * self.policy.factor)
            .floor()
            .to_u64()
            .unwrap_or(0);

        if attempt > self.policy.max_attempts || reduced < 1 {
            self.attempts.remove(symbol);
            return StepDownOutcome::Abandon { attempts: attempt };
        }

        self.attempts.insert(symbol.clone(), attempt);
        StepDownOutcome::StepDown {
            quantity: reduced,
            attempt,
        }
    }

    /// Attempts recorded for a symbol.
    #[must_use]
    pub fn attempts(&self, symbol: &Symbol) -> u32 {
        self.attempts.get(symbol).copied().unwrap_or(0)
    }

    /// Forget a symbol after a successful fill.
    pub fn clear(&mut self, symbol: &Symbol) {
        self.attempts.remove(symbol);
    }

    /// Symbols currently in recovery.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Returns true if no symbol is in recovery.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn steps_down_to_sixty_percent() {
        let mut counter = RecoveryCounter::default();
        let symbol = Symbol::new("AAPL");

        assert_eq!(
            counter.on_margin_rejection(&symbol, 100),
            StepDownOutcome::StepDown { quantity: 60, attempt: 1 }
        );
        assert_eq!(
            counter.on_margin_rejection(&symbol, 60),
            StepDownOutcome::StepDown { quantity: 36, attempt: 2 }
        );
        assert_eq!(counter.attempts(&symbol), 2);
    }

    #[test]
    fn abandons_after_max_attempts_and_clears() {
        let mut counter = RecoveryCounter::default();
        let symbol = Symbol::new("AAPL");

        counter.on_margin_rejection(&symbol, 100);
        counter.on_margin_rejection(&symbol, 60);
        let outcome = counter.on_margin_rejection(&symbol, 36);

        assert_eq!(outcome, StepDownOutcome::Abandon { attempts: 3 });
        assert_eq!(counter.attempts(&symbol), 0);
        assert!(counter.is_empty());
    }

    #[test]
    fn abandons_when_reduced_size_is_below_one_share() {
        let mut counter = RecoveryCounter::default();
        let symbol = Symbol::new("BRK.A");

        assert_eq!(counter.on_margin_rejection(&symbol, 1), StepDownOutcome::Abandon { attempts: 1 });
        assert!(counter.is_empty());
    }

    #[test]
    fn symbols_are_counted_independently() {
        let mut counter = RecoveryCounter::default();
        counter.on_margin_rejection(&Symbol::new("AAPL"), 100);
        counter.on_margin_rejection(&Symbol::new("MSFT"), 100);

        counter.clear(&Symbol::new("AAPL"));
        assert_eq!(counter.attempts(&Symbol::new("AAPL")), 0);
        assert_eq!(counter.attempts(&Symbol::new("MSFT")), 1);
    }

    proptest! {
        #[test]
        fn no_symbol_steps_down_unboundedly(max_attempts in 1u32..6, start in 1u64..1_000_000) {
            let mut counter = RecoveryCounter::new(StepDownPolicy { factor: dec!(0.60), max_attempts });
            let symbol = Symbol::new("AAPL");
            let mut quantity = start;

            for _ in 0..=max_attempts {
                match counter.on_margin_rejection(&symbol, quantity) {
                    StepDownOutcome::StepDown { quantity: next, attempt } => {
                        prop_assert!(attempt <= max_attempts);
                        prop_assert!(next < quantity);
                        quantity = next;
                    }
                    StepDownOutcome::Abandon { .. } => {
                        prop_assert_eq!(counter.attempts(&symbol), 0);
                        return Ok(());
                    }
                }
            }
            prop_assert!(false, "symbol was never abandoned");
        }
    }
}
