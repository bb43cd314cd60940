//! Buy signal and its admission state machine.
//!
//! ```text
//! PENDING ──► FRAGMENTING ──► COMPLETE
//!    │  │
//!    │  └──► GENERATING_LIQUIDITY ──► AWAITING_LIQUIDITY_CONFIRMATION ──► PENDING
//!    │               │                         │
//!    ▼               ▼                         ▼
//! FATAL_FAILURE   RETRYABLE_FAILURE ◄──────────┘   (RETRYABLE_FAILURE ──► PENDING)
//! ```
//!
//! Signals are never mutated in place: every transition yields a new value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::admission::PriceCeiling;
use crate::domain::shared::{DomainError, Money, SignalId, Symbol};

/// Admission state of a buy signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalState {
    /// Awaiting evaluation.
    Pending,
    /// Liquidity generator invoked.
    GeneratingLiquidity,
    /// Generated sell dispatched; parked until capital refreshes.
    AwaitingLiquidityConfirmation,
    /// Approved amount being split into fragments.
    Fragmenting,
    /// Fragments emitted.
    Complete,
    /// Gate failure; may be retried with a fresh snapshot.
    RetryableFailure,
    /// Requires intervention.
    FatalFailure,
}

impl SignalState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::FatalFailure)
    }

    /// Returns true if the signal can be (re-)evaluated.
    #[must_use]
    pub const fn is_evaluable(&self) -> bool {
        matches!(self, Self::Pending | Self::RetryableFailure)
    }

    /// Check if a state transition is valid.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (
                Self::Pending,
                Self::GeneratingLiquidity
                    | Self::Fragmenting
                    | Self::RetryableFailure
                    | Self::FatalFailure
            ) | (
                Self::GeneratingLiquidity,
                Self::AwaitingLiquidityConfirmation | Self::RetryableFailure
            ) | (
                Self::AwaitingLiquidityConfirmation,
                Self::Pending | Self::RetryableFailure
            ) | (Self::Fragmenting, Self::Complete | Self::RetryableFailure)
                | (Self::RetryableFailure, Self::Pending)
        )
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::GeneratingLiquidity => "GENERATING_LIQUIDITY",
            Self::AwaitingLiquidityConfirmation => "AWAITING_LIQUIDITY_CONFIRMATION",
            Self::Fragmenting => "FRAGMENTING",
            Self::Complete => "COMPLETE",
            Self::RetryableFailure => "RETRYABLE_FAILURE",
            Self::FatalFailure => "FATAL_FAILURE",
        };
        f.write_str(s)
    }
}

/// A buy intent from the decision engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuySignal {
    id: SignalId,
    symbol: Symbol,
    total_cost: Money,
    price: PriceCeiling,
    state: SignalState,
    liquidity_cycles: u32,
    failure_reason: Option<String>,
}

impl BuySignal {
    /// Create a pending buy signal.
    ///
    /// # Errors
    ///
    /// Returns error if the symbol is invalid, the cost is outside the order
    /// bounds of `Money::validate_for_order`, or a limit ceiling is not positive.
    pub fn new(
        id: SignalId,
        symbol: Symbol,
        total_cost: Money,
        price: PriceCeiling,
    ) -> Result<Self, DomainError> {
        symbol.validate()?;
        total_cost
            .validate_for_order()
            .map_err(|e| match e {
                DomainError::InvalidValue { message, .. } => DomainError::InvalidValue {
                    field: "total_cost".to_string(),
                    message,
                },
                other => other,
            })?;
        if let PriceCeiling::Limit(ceiling) = price {
            if ceiling <= rust_decimal::Decimal::ZERO {
                return Err(DomainError::InvalidValue {
                    field: "max_price".to_string(),
                    message: format!("Price ceiling must be positive, got {ceiling}"),
                });
            }
        }
        Ok(Self {
            id,
            symbol,
            total_cost,
            price,
            state: SignalState::Pending,
            liquidity_cycles: 0,
            failure_reason: None,
        })
    }

    /// Signal identifier.
    #[must_use]
    pub const fn id(&self) -> &SignalId {
        &self.id
    }

    /// Instrument to buy.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Requested notional.
    #[must_use]
    pub const fn total_cost(&self) -> Money {
        self.total_cost
    }

    /// Price ceiling supplied upstream.
    #[must_use]
    pub const fn price(&self) -> PriceCeiling {
        self.price
    }

    /// Current admission state.
    #[must_use]
    pub const fn state(&self) -> SignalState {
        self.state
    }

    /// Liquidity-generation rounds already attempted.
    #[must_use]
    pub const fn liquidity_cycles(&self) -> u32 {
        self.liquidity_cycles
    }

    /// Reason for the last failure state, if any.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Transition to a new state.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is not allowed from the current state.
    pub fn transition(&self, to: SignalState) -> Result<Self, DomainError> {
        if !self.state.can_transition_to(to) {
            return Err(DomainError::InvalidStateTransition {
                entity: format!("BuySignal {}", self.id),
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        let mut next = self.clone();
        next.state = to;
        if !matches!(to, SignalState::RetryableFailure | SignalState::FatalFailure) {
            next.failure_reason = None;
        }
        if to == SignalState::GeneratingLiquidity {
            next.liquidity_cycles += 1;
        }
        Ok(next)
    }

    /// Transition to a failure state, recording why.
    ///
    /// # Errors
    ///
    /// Returns error if the failure state is not reachable from the current state.
    pub fn fail(&self, to: SignalState, reason: impl Into<String>) -> Result<Self, DomainError> {
        let mut next = self.transition(to)?;
        next.failure_reason = Some(reason.into());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signal() -> BuySignal {
        BuySignal::new(
            SignalId::new("sig-1"),
            Symbol::new("AAPL"),
            Money::new(dec!(10_000)),
            PriceCeiling::Market,
        )
        .unwrap()
    }

    #[test]
    fn new_signal_is_pending() {
        let s = signal();
        assert_eq!(s.state(), SignalState::Pending);
        assert_eq!(s.liquidity_cycles(), 0);
        assert!(s.failure_reason().is_none());
    }

    #[test]
    fn new_rejects_non_positive_cost() {
        let result = BuySignal::new(SignalId::new("s"), Symbol::new("AAPL"), Money::ZERO, PriceCeiling::Market);
        assert!(result.is_err());
    }

    #[test]
    fn new_rejects_cost_outside_order_bounds() {
        for cost in [dec!(0.0000000000000000000000000001), dec!(0.001), dec!(10_000_000.01)] {
            let result = BuySignal::new(SignalId::new("s"), Symbol::new("AAPL"), Money::new(cost), PriceCeiling::Market);
            assert!(result.is_err(), "cost {cost} accepted");
        }
        assert!(
            BuySignal::new(SignalId::new("s"), Symbol::new("AAPL"), Money::new(dec!(0.01)), PriceCeiling::Market).is_ok()
        );
    }

    #[test]
    fn new_rejects_non_positive_ceiling() {
        let result = BuySignal::new(
            SignalId::new("s"),
            Symbol::new("AAPL"),
            Money::new(dec!(100)),
            PriceCeiling::Limit(dec!(0)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn transition_is_copy_on_write() {
        let original = signal();
        let next = original.transition(SignalState::Fragmenting).unwrap();
        assert_eq!(original.state(), SignalState::Pending);
        assert_eq!(next.state(), SignalState::Fragmenting);
    }

    #[test]
    fn liquidity_cycle_counts_generation_rounds() {
        let s = signal()
            .transition(SignalState::GeneratingLiquidity)
            .unwrap()
            .transition(SignalState::AwaitingLiquidityConfirmation)
            .unwrap()
            .transition(SignalState::Pending)
            .unwrap()
            .transition(SignalState::GeneratingLiquidity)
            .unwrap();
        assert_eq!(s.liquidity_cycles(), 2);
    }

    #[test]
    fn terminal_states_reject_transitions() {
        let complete = signal()
            .transition(SignalState::Fragmenting)
            .unwrap()
            .transition(SignalState::Complete)
            .unwrap();
        assert!(complete.state().is_terminal());
        assert!(complete.transition(SignalState::Pending).is_err());
    }

    #[test]
    fn fail_records_reason_and_retry_clears_it() {
        let failed = signal().fail(SignalState::RetryableFailure, "no liquidity").unwrap();
        assert_eq!(failed.failure_reason(), Some("no liquidity"));

        let retried = failed.transition(SignalState::Pending).unwrap();
        assert!(retried.failure_reason().is_none());
    }

    #[test]
    fn awaiting_cannot_skip_to_fragmenting() {
        let parked = signal()
            .transition(SignalState::GeneratingLiquidity)
            .unwrap()
            .transition(SignalState::AwaitingLiquidityConfirmation)
            .unwrap();
        assert!(parked.transition(SignalState::Fragmenting).is_err());
    }

    #[test]
    fn state_display() {
        assert_eq!(
            SignalState::AwaitingLiquidityConfirmation.to_string(),
            "AWAITING_LIQUIDITY_CONFIRMATION"
        );
    }
}
