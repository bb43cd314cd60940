//! Evaluate Signal Use Case
//!
//! The admission decision for one buy signal against one capital snapshot.
//! Synchronous and side-effect free apart from alerts: the caller dispatches
//! whatever the decision contains.
//!
//! | Funds                                  | Outcome                              |
//! |----------------------------------------|--------------------------------------|
//! | usable covers cost                     | fragment the full cost               |
//! | short, `HIGH_LIQUIDITY`                | shrink to usable, fragment that      |
//! | short, any other mode                  | propose a liquidity sell and park    |
//! | short, no eligible holding             | `RETRYABLE_FAILURE`                  |
//! | liquidity rounds exhausted             | `FATAL_FAILURE` + critical alert     |

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::ports::{AlertLevel, NotifierPort, ReferencePriceSource};
use crate::domain::admission::{BuyFragment, BuySignal, FragmentationPolicy, SignalState, build_fragments};
use crate::domain::capital::{CapitalSnapshot, EvaluatedPosition};
use crate::domain::dispatch::{OrderSide, QueuedOrder};
use crate::domain::liquidity::{
    Classification, GenerationOutcome, LiquidityClassifier, LiquidityGenerator, LiquidityMode, SellOrder,
};
use crate::domain::shared::{DomainError, Money, Quantity, SignalId, TransactionId};

/// Admission limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionPolicy {
    /// Fragments per admitted buy.
    pub fragment_count: usize,
    /// Liquidity-generation rounds allowed before a signal is fatal.
    pub max_liquidity_cycles: u32,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            fragment_count: 3,
            max_liquidity_cycles: 3,
        }
    }
}

/// Admission error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdmissionError {
    /// The signal is not in a state that can be evaluated.
    #[error("Signal {id} cannot be evaluated in state {state}")]
    NotEvaluable {
        /// Signal.
        id: SignalId,
        /// Its current state.
        state: SignalState,
    },

    /// A state transition was refused.
    #[error("Signal transition failed: {0}")]
    Transition(#[from] DomainError),

    /// No signal with this id is known.
    #[error("Unknown signal {0}")]
    UnknownSignal(SignalId),
}

/// Result of one admission evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    /// The signal in its resulting state.
    pub signal: BuySignal,
    /// Classification the decision was based on.
    pub classification: Option<Classification>,
    /// Child orders to dispatch; empty unless the signal is `COMPLETE`.
    pub fragments: Vec<BuyFragment>,
    /// Liquidity sell to dispatch when the signal is awaiting liquidity.
    pub sell: Option<SellOrder>,
}

impl AdmissionDecision {
    fn without_orders(signal: BuySignal, classification: Option<Classification>) -> Self {
        Self {
            signal,
            classification,
            fragments: Vec::new(),
            sell: None,
        }
    }

    /// Sum of fragment cost shares.
    #[must_use]
    pub fn fragment_cost(&self) -> Money {
        self.fragments.iter().map(|f| f.cost_share).sum()
    }
}

/// The admission decision core.
pub struct AdmissionOrchestrator {
    classifier: LiquidityClassifier,
    generator: LiquidityGenerator,
    fragmentation: Arc<dyn FragmentationPolicy>,
    prices: Arc<dyn ReferencePriceSource>,
    notifier: Arc<dyn NotifierPort>,
    policy: AdmissionPolicy,
}

impl AdmissionOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        classifier: LiquidityClassifier,
        generator: LiquidityGenerator,
        fragmentation: Arc<dyn FragmentationPolicy>,
        prices: Arc<dyn ReferencePriceSource>,
        notifier: Arc<dyn NotifierPort>,
        policy: AdmissionPolicy,
    ) -> Self {
        Self {
            classifier,
            generator,
            fragmentation,
            prices,
            notifier,
            policy,
        }
    }

    /// Evaluate a pending (or retryable) signal.
    ///
    /// Gate failures are outcomes, reported through the resulting signal
    /// state; errors are reserved for signals that cannot be evaluated.
    pub fn evaluate(
        &self,
        signal: &BuySignal,
        snapshot: &CapitalSnapshot,
        positions: &[EvaluatedPosition],
    ) -> Result<AdmissionDecision, AdmissionError> {
        let signal = match signal.state() {
            SignalState::Pending => signal.clone(),
            SignalState::RetryableFailure => signal.transition(SignalState::Pending)?,
            state => {
                return Err(AdmissionError::NotEvaluable {
                    id: signal.id().clone(),
                    state,
                });
            }
        };

        if signal.liquidity_cycles() >= self.policy.max_liquidity_cycles {
            let reason = format!(
                "{} liquidity rounds did not free enough buying power",
                signal.liquidity_cycles()
            );
            let failed = signal.fail(SignalState::FatalFailure, reason.clone())?;
            tracing::error!(signal_id = %failed.id(), symbol = %failed.symbol(), %reason, "Signal failed");
            self.notifier.notify_liquidity_alert(
                AlertLevel::Critical,
                &format!("Buy {} for {} failed: {reason}", failed.id(), failed.symbol()),
            );
            return Ok(AdmissionDecision::without_orders(failed, None));
        }

        let cost = signal.total_cost();
        let classification = self.classifier.classify(snapshot, cost);
        tracing::debug!(
            signal_id = %signal.id(),
            mode = %classification.mode,
            usable = %classification.usable_buying_power,
            %cost,
            "Signal classified"
        );

        if classification.covers(cost) {
            return self.fragment(signal, classification, cost);
        }
        if classification.mode == LiquidityMode::HighLiquidity {
            tracing::info!(
                signal_id = %signal.id(),
                requested = %cost,
                approved = %classification.usable_buying_power,
                "Shrinking buy to per-order cap"
            );
            return self.fragment(signal, classification, classification.usable_buying_power);
        }
        self.generate_liquidity(signal, classification, positions)
    }

    /// Re-admit a stepped-down order before it is queued again.
    ///
    /// Sells free capital and pass unchanged, as do buys with no price to
    /// size them by; dispatch still reserves those at the fallback price.
    /// A priced buy is classified against `snapshot` and cut to the whole
    /// shares usable buying power covers. Resubmissions never start a
    /// liquidity round. `None` means not even one share is admitted.
    pub fn readmit(&self, order: &QueuedOrder, snapshot: &CapitalSnapshot) -> Option<QueuedOrder> {
        if order.side == OrderSide::Sell {
            return Some(order.clone());
        }
        let price = order
            .kind
            .limit_price()
            .or_else(|| self.prices.reference_price(&order.symbol))
            .filter(|p| *p > Decimal::ZERO);
        let Some(price) = price else {
            tracing::debug!(symbol = %order.symbol, "No price to re-admit by, passing resubmission through");
            return Some(order.clone());
        };

        let cost = Money::new(order.quantity.amount().checked_mul(price)?);
        let classification = self.classifier.classify(snapshot, cost);
        if classification.covers(cost) {
            return Some(order.clone());
        }

        let affordable = classification
            .usable_buying_power
            .amount()
            .checked_div(price)
            .map_or(Decimal::ZERO, |shares| shares.floor().min(order.quantity.amount()));
        if affordable < Decimal::ONE {
            tracing::warn!(
                symbol = %order.symbol,
                transaction_id = %order.transaction_id,
                mode = %classification.mode,
                usable = %classification.usable_buying_power,
                %cost,
                "Resubmission not admitted"
            );
            return None;
        }
        tracing::info!(
            symbol = %order.symbol,
            transaction_id = %order.transaction_id,
            mode = %classification.mode,
            from = %order.quantity,
            to = %affordable,
            "Shrinking resubmission to usable buying power"
        );
        Some(QueuedOrder {
            quantity: Quantity::new(affordable),
            ..order.clone()
        })
    }

    fn fragment(
        &self,
        signal: BuySignal,
        classification: Classification,
        approved: Money,
    ) -> Result<AdmissionDecision, AdmissionError> {
        let price = signal
            .price()
            .limit()
            .or_else(|| self.prices.reference_price(signal.symbol()))
            .filter(|p| *p > Decimal::ZERO);
        let Some(price) = price else {
            let failed = signal.fail(SignalState::RetryableFailure, "no reference price to size fragments")?;
            tracing::warn!(signal_id = %failed.id(), symbol = %failed.symbol(), "No price for fragment sizing");
            return Ok(AdmissionDecision::without_orders(failed, Some(classification)));
        };

        let fragmenting = signal.transition(SignalState::Fragmenting)?;
        let fragments = build_fragments(
            fragmenting.id(),
            fragmenting.symbol(),
            fragmenting.price(),
            approved,
            price,
            self.fragmentation.as_ref(),
        );

        if fragments.is_empty() {
            let failed = fragmenting.fail(
                SignalState::RetryableFailure,
                format!("{approved} buys no whole share at {price}"),
            )?;
            tracing::warn!(signal_id = %failed.id(), %approved, %price, "Approved amount too small to fragment");
            return Ok(AdmissionDecision::without_orders(failed, Some(classification)));
        }

        let complete = fragmenting.transition(SignalState::Complete)?;
        tracing::info!(
            signal_id = %complete.id(),
            symbol = %complete.symbol(),
            mode = %classification.mode,
            %approved,
            fragments = fragments.len(),
            "Buy admitted"
        );
        Ok(AdmissionDecision {
            signal: complete,
            classification: Some(classification),
            fragments,
            sell: None,
        })
    }

    fn generate_liquidity(
        &self,
        signal: BuySignal,
        classification: Classification,
        positions: &[EvaluatedPosition],
    ) -> Result<AdmissionDecision, AdmissionError> {
        let required = signal.total_cost() - classification.usable_buying_power;
        let generating = signal.transition(SignalState::GeneratingLiquidity)?;
        let transaction_id = TransactionId::new(format!(
            "{}-gdl-{}",
            generating.id(),
            generating.liquidity_cycles()
        ));

        match self.generator.propose(required, positions, transaction_id) {
            GenerationOutcome::Sell(sell) => {
                let awaiting = generating.transition(SignalState::AwaitingLiquidityConfirmation)?;
                tracing::info!(
                    signal_id = %awaiting.id(),
                    mode = %classification.mode,
                    %required,
                    sell_symbol = %sell.symbol,
                    sell_quantity = %sell.quantity,
                    cycle = awaiting.liquidity_cycles(),
                    "Liquidity sell proposed"
                );
                Ok(AdmissionDecision {
                    signal: awaiting,
                    classification: Some(classification),
                    fragments: Vec::new(),
                    sell: Some(sell),
                })
            }
            GenerationOutcome::NoLiquidity(reason) => {
                let failed = generating.fail(SignalState::RetryableFailure, reason.to_string())?;
                tracing::info!(
                    signal_id = %failed.id(),
                    mode = %classification.mode,
                    %required,
                    %reason,
                    "No liquidity source"
                );
                Ok(AdmissionDecision::without_orders(failed, Some(classification)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockNotifierPort, NoOpNotifier, NoPriceSource};
    use crate::domain::admission::{EqualSplit, PriceCeiling};
    use crate::domain::dispatch::{OrderKind, OrderOrigin};
    use crate::domain::shared::Symbol;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn orchestrator(notifier: Arc<dyn NotifierPort>) -> AdmissionOrchestrator {
        AdmissionOrchestrator::new(
            LiquidityClassifier::default(),
            LiquidityGenerator::default(),
            Arc::new(EqualSplit::default()),
            Arc::new(NoPriceSource),
            notifier,
            AdmissionPolicy::default(),
        )
    }

    fn signal(cost: Decimal, price: PriceCeiling) -> BuySignal {
        BuySignal::new(SignalId::new("sig-1"), Symbol::new("AAPL"), Money::new(cost), price).unwrap()
    }

    fn snapshot(buying_power: Decimal, cash: Decimal, reserve: Decimal) -> CapitalSnapshot {
        CapitalSnapshot::new(
            Money::new(buying_power),
            Money::new(dec!(100_000)),
            Money::new(cash),
            Money::new(dec!(20_000)),
            reserve,
        )
    }

    fn profitable() -> Vec<EvaluatedPosition> {
        vec![
            EvaluatedPosition::new(Symbol::new("MSFT"), Quantity::from_u64(200), dec!(300), Money::new(dec!(4_000)))
                .unwrap(),
        ]
    }

    #[test]
    fn sufficient_funds_fragment_full_cost() {
        let decision = orchestrator(Arc::new(NoOpNotifier))
            .evaluate(
                &signal(dec!(10_000), PriceCeiling::Limit(dec!(100))),
                &snapshot(dec!(12_000), dec!(500), dec!(0.20)),
                &[],
            )
            .unwrap();

        assert_eq!(decision.signal.state(), SignalState::Complete);
        assert_eq!(decision.classification.unwrap().mode, LiquidityMode::HighLiquidity);
        assert_eq!(decision.fragments.len(), 3);
        assert_eq!(decision.fragment_cost(), Money::new(dec!(10_000)));
        assert_eq!(decision.fragments[0].quantity, Quantity::from_u64(33));
    }

    #[test]
    fn high_liquidity_shortfall_shrinks_to_cap() {
        // bp 10_500 covers cost, usable = 9_450 does not
        let decision = orchestrator(Arc::new(NoOpNotifier))
            .evaluate(
                &signal(dec!(10_000), PriceCeiling::Limit(dec!(100))),
                &snapshot(dec!(10_500), dec!(500), dec!(0.20)),
                &profitable(),
            )
            .unwrap();

        assert_eq!(decision.signal.state(), SignalState::Complete);
        assert_eq!(decision.fragment_cost(), Money::new(dec!(9_450)));
        assert!(decision.sell.is_none());
    }

    #[test]
    fn safe_mode_shortfall_proposes_sell_and_parks() {
        let decision = orchestrator(Arc::new(NoOpNotifier))
            .evaluate(
                &signal(dec!(10_000), PriceCeiling::Market),
                &snapshot(dec!(5_000), dec!(500), dec!(0.20)),
                &profitable(),
            )
            .unwrap();

        assert_eq!(decision.signal.state(), SignalState::AwaitingLiquidityConfirmation);
        assert!(decision.fragments.is_empty());
        let sell = decision.sell.unwrap();
        assert_eq!(sell.symbol, Symbol::new("MSFT"));
        assert_eq!(sell.transaction_id, TransactionId::new("sig-1-gdl-1"));
        // required = 10_000 - 750 = 9_250; mark 320 -> ceil = 29
        assert_eq!(sell.quantity, Quantity::from_u64(29));
    }

    #[test]
    fn no_eligible_holding_is_retryable_without_alert() {
        let mut notifier = MockNotifierPort::new();
        notifier.expect_notify_liquidity_alert().never();

        let decision = orchestrator(Arc::new(notifier))
            .evaluate(
                &signal(dec!(10_000), PriceCeiling::Market),
                &snapshot(dec!(5_000), dec!(500), dec!(0.20)),
                &[],
            )
            .unwrap();

        assert_eq!(decision.signal.state(), SignalState::RetryableFailure);
        assert_eq!(decision.signal.failure_reason(), Some("no profitable position to trim"));
        assert!(decision.fragments.is_empty());
    }

    #[test]
    fn market_buy_without_quote_is_retryable() {
        let decision = orchestrator(Arc::new(NoOpNotifier))
            .evaluate(
                &signal(dec!(1_000), PriceCeiling::Market),
                &snapshot(dec!(50_000), dec!(500), dec!(0.20)),
                &[],
            )
            .unwrap();

        assert_eq!(decision.signal.state(), SignalState::RetryableFailure);
        assert!(decision.fragments.is_empty());
    }

    #[test]
    fn exhausted_liquidity_rounds_are_fatal_and_alert() {
        let mut notifier = MockNotifierPort::new();
        notifier
            .expect_notify_liquidity_alert()
            .withf(|level, _| *level == AlertLevel::Critical)
            .times(1)
            .return_const(());
        let orchestrator = orchestrator(Arc::new(notifier));

        let mut current = signal(dec!(10_000), PriceCeiling::Market);
        for _ in 0..3 {
            let decision = orchestrator
                .evaluate(&current, &snapshot(dec!(5_000), dec!(500), dec!(0.20)), &profitable())
                .unwrap();
            assert_eq!(decision.signal.state(), SignalState::AwaitingLiquidityConfirmation);
            current = decision.signal.transition(SignalState::Pending).unwrap();
        }

        let decision = orchestrator
            .evaluate(&current, &snapshot(dec!(5_000), dec!(500), dec!(0.20)), &profitable())
            .unwrap();
        assert_eq!(decision.signal.state(), SignalState::FatalFailure);
    }

    #[test]
    fn retryable_signal_re_enters_pending() {
        let failed = signal(dec!(1_000), PriceCeiling::Limit(dec!(10)))
            .fail(SignalState::RetryableFailure, "earlier gate")
            .unwrap();

        let decision = orchestrator(Arc::new(NoOpNotifier))
            .evaluate(&failed, &snapshot(dec!(50_000), dec!(500), dec!(0.20)), &[])
            .unwrap();
        assert_eq!(decision.signal.state(), SignalState::Complete);
    }

    #[test]
    fn parked_signal_is_not_evaluable() {
        let parked = signal(dec!(1_000), PriceCeiling::Market)
            .transition(SignalState::GeneratingLiquidity)
            .unwrap()
            .transition(SignalState::AwaitingLiquidityConfirmation)
            .unwrap();

        let result = orchestrator(Arc::new(NoOpNotifier)).evaluate(&parked, &CapitalSnapshot::empty(), &[]);
        assert!(matches!(result, Err(AdmissionError::NotEvaluable { .. })));
    }

    fn resubmission(side: OrderSide, quantity: u64, kind: OrderKind) -> QueuedOrder {
        QueuedOrder {
            symbol: Symbol::new("AAPL"),
            side,
            quantity: Quantity::from_u64(quantity),
            kind,
            transaction_id: TransactionId::new("sig-1-frag-1"),
            origin: OrderOrigin::Fragment,
        }
    }

    #[test]
    fn readmit_passes_covered_buy_unchanged() {
        let order = resubmission(OrderSide::Buy, 60, OrderKind::Limit { price: dec!(100) });
        let admitted = orchestrator(Arc::new(NoOpNotifier))
            .readmit(&order, &snapshot(dec!(12_000), dec!(500), dec!(0.20)))
            .unwrap();
        assert_eq!(admitted, order);
    }

    #[test]
    fn readmit_cuts_buy_to_usable_buying_power() {
        let order = resubmission(OrderSide::Buy, 60, OrderKind::Limit { price: dec!(100) });
        // HIGH_LIQUIDITY: 90% of 6_000 buys 54 shares at 100
        let admitted = orchestrator(Arc::new(NoOpNotifier))
            .readmit(&order, &snapshot(dec!(6_000), dec!(500), dec!(0.20)))
            .unwrap();
        assert_eq!(admitted.quantity, Quantity::from_u64(54));
        assert_eq!(admitted.transaction_id, order.transaction_id);
        assert_eq!(admitted.origin, OrderOrigin::Fragment);
    }

    #[test]
    fn readmit_refuses_buy_without_a_whole_share() {
        let order = resubmission(OrderSide::Buy, 60, OrderKind::Limit { price: dec!(100) });
        let admitted = orchestrator(Arc::new(NoOpNotifier)).readmit(&order, &snapshot(dec!(100), dec!(500), dec!(0.05)));
        assert!(admitted.is_none());
    }

    #[test_case(OrderSide::Sell, OrderKind::Limit { price: dec!(100) } ; "sell")]
    #[test_case(OrderSide::Buy, OrderKind::Market ; "unpriced buy")]
    fn readmit_passes_through(side: OrderSide, kind: OrderKind) {
        let order = resubmission(side, 60, kind);
        let admitted = orchestrator(Arc::new(NoOpNotifier))
            .readmit(&order, &snapshot(dec!(100), dec!(500), dec!(0.05)))
            .unwrap();
        assert_eq!(admitted, order);
    }
}
