//! Order Flow Use Case
//!
//! Drives signals through admission and owns the pause/resume handshake
//! around liquidity generation:
//!
//! 1. A short signal gets a liquidity sell; the sell is dispatched and the
//!    signal is parked.
//! 2. A later liquidity-replenished notification refreshes the cache and
//!    resumes exactly one parked signal, oldest first, against freshly read
//!    cash and positions.
//! 3. Admitted fragments go to the serialized order queue.
//!
//! Parked signals that see no confirmation within the park timeout are
//! expired to `RETRYABLE_FAILURE` by a periodic sweep. The same sweep forgets
//! retryable signals nobody retried within the retry window. Complete and
//! fatal signals are not kept.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::BrokerPort;
use crate::application::services::{AccountStateCache, DispatchGateway, SerializedOrderQueue};
use crate::application::use_cases::{AdmissionDecision, AdmissionError, AdmissionOrchestrator};
use crate::domain::admission::{BuySignal, SignalState};
use crate::domain::capital::CapitalSnapshot;
use crate::domain::dispatch::QueuedOrder;
use crate::domain::shared::{Money, SignalId, TransactionId};

/// Parking limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumePolicy {
    /// Signals that may wait on liquidity at once.
    pub max_parked: usize,
    /// Seconds a parked signal waits before it is expired.
    pub park_timeout_secs: u64,
    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,
    /// Seconds a retryable signal stays available to `retry`.
    pub retry_window_secs: u64,
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self {
            max_parked: 16,
            park_timeout_secs: 300,
            sweep_interval_secs: 5,
            retry_window_secs: 600,
        }
    }
}

impl ResumePolicy {
    /// Park timeout as a duration.
    #[must_use]
    pub const fn park_timeout(&self) -> Duration {
        Duration::from_secs(self.park_timeout_secs)
    }

    /// Retry window as a duration.
    #[must_use]
    pub const fn retry_window(&self) -> Duration {
        Duration::from_secs(self.retry_window_secs)
    }

    /// Sweep interval as a duration.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug)]
struct ParkedSignal {
    signal: BuySignal,
    sell_transaction_id: TransactionId,
    parked_at: Instant,
}

#[derive(Debug)]
struct TrackedSignal {
    signal: BuySignal,
    recorded_at: Instant,
}

/// Admission flow with liquidity pause/resume.
pub struct OrderFlowManager<B>
where
    B: BrokerPort + 'static,
{
    orchestrator: AdmissionOrchestrator,
    cache: Arc<AccountStateCache>,
    gateway: Arc<DispatchGateway<B>>,
    queue: SerializedOrderQueue,
    policy: ResumePolicy,
    parked: Mutex<VecDeque<ParkedSignal>>,
    signals: Mutex<HashMap<SignalId, TrackedSignal>>,
}

impl<B> OrderFlowManager<B>
where
    B: BrokerPort + 'static,
{
    /// Create a flow manager.
    pub fn new(
        orchestrator: AdmissionOrchestrator,
        cache: Arc<AccountStateCache>,
        gateway: Arc<DispatchGateway<B>>,
        queue: SerializedOrderQueue,
        policy: ResumePolicy,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            gateway,
            queue,
            policy,
            parked: Mutex::new(VecDeque::new()),
            signals: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluate a new or retryable signal and act on the decision.
    pub async fn submit_signal(&self, signal: BuySignal) -> Result<AdmissionDecision, AdmissionError> {
        let decision = self
            .orchestrator
            .evaluate(&signal, &self.admission_snapshot(), &self.cache.positions())?;
        Ok(self.apply(decision).await)
    }

    /// Re-submit a signal that ended in `RETRYABLE_FAILURE`.
    pub async fn retry(&self, id: &SignalId) -> Result<AdmissionDecision, AdmissionError> {
        let signal = self
            .signal(id)
            .ok_or_else(|| AdmissionError::UnknownSignal(id.clone()))?;
        if signal.state() != SignalState::RetryableFailure {
            return Err(AdmissionError::NotEvaluable {
                id: id.clone(),
                state: signal.state(),
            });
        }
        self.submit_signal(signal).await
    }

    /// Re-admit a stepped-down order and queue what is admitted.
    ///
    /// The order is checked against the cached snapshot net of in-flight
    /// buys, like a new signal. Returns the queued order, if any.
    pub fn resubmit(&self, order: &QueuedOrder) -> Option<QueuedOrder> {
        let admitted = self.orchestrator.readmit(order, &self.admission_snapshot())?;
        match self.queue.enqueue(admitted.clone()) {
            Ok(()) => Some(admitted),
            Err(e) => {
                tracing::error!(transaction_id = %order.transaction_id, error = %e, "Resubmission not queued");
                None
            }
        }
    }

    /// Capital metrics were refreshed after a liquidity sell.
    ///
    /// Applies the metrics to the cache, then resumes the oldest parked
    /// signal. Without a parked signal this is a no-op.
    pub async fn on_liquidity_replenished(
        &self,
        buying_power: Money,
        net_liquidation_value: Money,
        reserve_margin_fraction: Decimal,
    ) -> Result<Option<AdmissionDecision>, AdmissionError> {
        self.cache
            .apply_liquidity_refresh(buying_power, net_liquidation_value, reserve_margin_fraction);

        let Some(parked) = self.parked.lock().pop_front() else {
            tracing::debug!(%buying_power, "Liquidity replenished with no parked signal");
            return Ok(None);
        };

        let waited = parked.parked_at.elapsed();
        let resumed = parked.signal.transition(SignalState::Pending)?;
        tracing::info!(
            signal_id = %resumed.id(),
            sell_transaction_id = %parked.sell_transaction_id,
            waited_ms = waited.as_millis() as u64,
            %buying_power,
            %reserve_margin_fraction,
            "Resuming parked signal"
        );

        let decision = self
            .orchestrator
            .evaluate(&resumed, &self.admission_snapshot(), &self.cache.positions())?;
        Ok(Some(self.apply(decision).await))
    }

    /// Expire parked signals older than the park timeout.
    ///
    /// Retryable signals older than the retry window are forgotten first, so
    /// signals expired by this sweep stay retryable for a full window.
    pub fn expire_stale(&self, now: Instant) -> Vec<BuySignal> {
        self.forget_unretried(now);

        let timeout = self.policy.park_timeout();
        let stale: Vec<ParkedSignal> = {
            let mut parked = self.parked.lock();
            let (stale, fresh): (Vec<ParkedSignal>, Vec<ParkedSignal>) = parked
                .drain(..)
                .partition(|p| now.saturating_duration_since(p.parked_at) >= timeout);
            parked.extend(fresh);
            stale
        };

        let mut expired = Vec::with_capacity(stale.len());
        for parked in stale {
            match parked
                .signal
                .fail(SignalState::RetryableFailure, "liquidity confirmation timed out")
            {
                Ok(failed) => {
                    tracing::warn!(
                        signal_id = %failed.id(),
                        sell_transaction_id = %parked.sell_transaction_id,
                        timeout_secs = timeout.as_secs(),
                        "Parked signal expired"
                    );
                    self.record(&failed);
                    expired.push(failed);
                }
                Err(e) => tracing::error!(signal_id = %parked.signal.id(), error = %e, "Cannot expire parked signal"),
            }
        }
        expired
    }

    /// Spawn the periodic expiry sweep.
    pub fn spawn_expiry_sweeper(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = self.policy.sweep_interval().max(Duration::from_millis(10));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("Expiry sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        manager.expire_stale(Instant::now());
                    }
                }
            }
        })
    }

    /// Latest known version of a signal that is still in flight or retryable.
    pub fn signal(&self, id: &SignalId) -> Option<BuySignal> {
        self.signals.lock().get(id).map(|tracked| tracked.signal.clone())
    }

    /// Number of signals still tracked.
    pub fn tracked_count(&self) -> usize {
        self.signals.lock().len()
    }

    /// Parked signal ids, oldest first.
    pub fn parked_ids(&self) -> Vec<SignalId> {
        self.parked.lock().iter().map(|p| p.signal.id().clone()).collect()
    }

    /// Number of parked signals.
    pub fn parked_count(&self) -> usize {
        self.parked.lock().len()
    }

    fn admission_snapshot(&self) -> CapitalSnapshot {
        self.cache
            .snapshot()
            .net_of_in_flight(self.gateway.in_flight_buy_notional())
    }

    async fn apply(&self, decision: AdmissionDecision) -> AdmissionDecision {
        let decision = match decision.signal.state() {
            SignalState::Complete => {
                self.enqueue_fragments(&decision);
                decision
            }
            SignalState::AwaitingLiquidityConfirmation => self.dispatch_liquidity_sell(decision).await,
            _ => decision,
        };
        self.record(&decision.signal);
        decision
    }

    fn enqueue_fragments(&self, decision: &AdmissionDecision) {
        for fragment in &decision.fragments {
            if let Err(e) = self.queue.enqueue(QueuedOrder::from_fragment(fragment)) {
                tracing::error!(
                    signal_id = %decision.signal.id(),
                    transaction_id = %fragment.transaction_id,
                    error = %e,
                    "Fragment not queued"
                );
            }
        }
    }

    async fn dispatch_liquidity_sell(&self, decision: AdmissionDecision) -> AdmissionDecision {
        let Some(sell) = decision.sell.clone() else {
            return self.fail_parking(decision, "no liquidity sell to dispatch".to_string());
        };
        let id = decision.signal.id().clone();

        // Parked before the sell goes out: its fill may be applied before submit returns.
        {
            let mut parked = self.parked.lock();
            parked.retain(|p| p.signal.id() != &id);
            if parked.len() >= self.policy.max_parked {
                drop(parked);
                return self.fail_parking(decision, format!("{} signals already parked", self.policy.max_parked));
            }
            parked.push_back(ParkedSignal {
                signal: decision.signal.clone(),
                sell_transaction_id: sell.transaction_id.clone(),
                parked_at: Instant::now(),
            });
        }

        match self.gateway.submit(&QueuedOrder::from_sell(&sell)).await {
            Ok(receipt) => {
                tracing::info!(
                    signal_id = %id,
                    sell_order_id = %receipt.broker_order_id,
                    symbol = %sell.symbol,
                    quantity = %sell.quantity,
                    "Signal parked awaiting liquidity"
                );
                decision
            }
            Err(e) => {
                let still_parked = {
                    let mut parked = self.parked.lock();
                    let before = parked.len();
                    parked.retain(|p| p.signal.id() != &id);
                    parked.len() != before
                };
                if still_parked {
                    self.fail_parking(decision, format!("liquidity sell not dispatched: {e}"))
                } else {
                    tracing::warn!(signal_id = %id, error = %e, "Liquidity sell failed after the signal was resumed");
                    decision
                }
            }
        }
    }

    fn fail_parking(&self, mut decision: AdmissionDecision, reason: String) -> AdmissionDecision {
        match decision.signal.fail(SignalState::RetryableFailure, reason.clone()) {
            Ok(failed) => {
                tracing::warn!(signal_id = %failed.id(), %reason, "Signal not parked");
                decision.signal = failed;
            }
            Err(e) => tracing::error!(signal_id = %decision.signal.id(), error = %e, "Cannot fail signal"),
        }
        decision
    }

    fn record(&self, signal: &BuySignal) {
        let mut signals = self.signals.lock();
        match signal.state() {
            SignalState::Complete | SignalState::FatalFailure => {
                signals.remove(signal.id());
            }
            _ => {
                signals.insert(
                    signal.id().clone(),
                    TrackedSignal {
                        signal: signal.clone(),
                        recorded_at: Instant::now(),
                    },
                );
            }
        }
    }

    fn forget_unretried(&self, now: Instant) {
        let window = self.policy.retry_window();
        self.signals.lock().retain(|id, tracked| {
            let keep = tracked.signal.state() != SignalState::RetryableFailure
                || now.saturating_duration_since(tracked.recorded_at) < window;
            if !keep {
                tracing::info!(signal_id = %id, window_secs = window.as_secs(), "Retryable signal not retried, forgetting");
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BrokerError, Contract, NoOpNotifier, OrderSpec, ReferencePriceSource};
    use crate::application::services::{DispatchPolicy, OrderQueueReceiver};
    use crate::application::use_cases::AdmissionPolicy;
    use crate::domain::admission::{EqualSplit, PriceCeiling};
    use crate::domain::capital::EvaluatedPosition;
    use crate::domain::dispatch::OrderSide;
    use crate::domain::liquidity::{LiquidityClassifier, LiquidityGenerator};
    use crate::domain::shared::{BrokerOrderId, Quantity, Symbol};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct RecordingBroker {
        submitted: Mutex<Vec<OrderSpec>>,
    }

    #[async_trait]
    impl BrokerPort for RecordingBroker {
        async fn submit_order(
            &self,
            _order_id: BrokerOrderId,
            _contract: &Contract,
            spec: &OrderSpec,
        ) -> Result<(), BrokerError> {
            self.submitted.lock().push(spec.clone());
            Ok(())
        }
    }

    struct FixedPrice(Decimal);

    impl ReferencePriceSource for FixedPrice {
        fn reference_price(&self, _symbol: &Symbol) -> Option<Decimal> {
            Some(self.0)
        }
    }

    struct Harness {
        manager: Arc<OrderFlowManager<RecordingBroker>>,
        broker: Arc<RecordingBroker>,
        cache: Arc<AccountStateCache>,
        _rx: OrderQueueReceiver,
        queue: SerializedOrderQueue,
    }

    fn harness(policy: ResumePolicy) -> Harness {
        harness_with(policy, AdmissionPolicy::default())
    }

    fn harness_with(policy: ResumePolicy, admission: AdmissionPolicy) -> Harness {
        let cache = Arc::new(AccountStateCache::with_snapshot(CapitalSnapshot::new(
            Money::new(dec!(5_000)),
            Money::new(dec!(60_000)),
            Money::new(dec!(500)),
            Money::new(dec!(12_000)),
            dec!(0.20),
        )));
        cache.on_position_snapshot(vec![
            EvaluatedPosition::new(Symbol::new("MSFT"), Quantity::from_u64(200), dec!(300), Money::new(dec!(4_000)))
                .unwrap(),
        ]);
        cache.on_position_snapshot_end();

        let broker = Arc::new(RecordingBroker::default());
        let prices: Arc<dyn ReferencePriceSource> = Arc::new(FixedPrice(dec!(100)));
        let gateway = Arc::new(DispatchGateway::new(
            Arc::clone(&broker),
            Arc::clone(&cache),
            Arc::clone(&prices),
            Arc::new(NoOpNotifier),
            DispatchPolicy::default(),
        ));
        let orchestrator = AdmissionOrchestrator::new(
            LiquidityClassifier::default(),
            LiquidityGenerator::default(),
            Arc::new(EqualSplit::default()),
            prices,
            Arc::new(NoOpNotifier),
            admission,
        );
        let (queue, rx) = SerializedOrderQueue::new(64);
        let manager = Arc::new(OrderFlowManager::new(
            orchestrator,
            Arc::clone(&cache),
            gateway,
            queue.clone(),
            policy,
        ));
        Harness {
            manager,
            broker,
            cache,
            _rx: rx,
            queue,
        }
    }

    fn signal(id: &str) -> BuySignal {
        BuySignal::new(SignalId::new(id), Symbol::new("AAPL"), Money::new(dec!(10_000)), PriceCeiling::Market).unwrap()
    }

    #[tokio::test]
    async fn short_signal_dispatches_sell_and_parks() {
        let h = harness(ResumePolicy::default());

        let decision = h.manager.submit_signal(signal("sig-1")).await.unwrap();

        assert_eq!(decision.signal.state(), SignalState::AwaitingLiquidityConfirmation);
        assert_eq!(h.manager.parked_ids(), vec![SignalId::new("sig-1")]);
        let submitted = h.broker.submitted.lock();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].action, OrderSide::Sell);
    }

    #[tokio::test]
    async fn resume_with_fresh_capital_admits_full_cost() {
        let h = harness(ResumePolicy::default());
        h.manager.submit_signal(signal("sig-1")).await.unwrap();

        let decision = h
            .manager
            .on_liquidity_replenished(Money::new(dec!(12_000)), Money::new(dec!(60_000)), dec!(0.20))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(decision.signal.state(), SignalState::Complete);
        assert_eq!(decision.fragments.len(), 3);
        assert_eq!(decision.fragment_cost(), Money::new(dec!(10_000)));
        assert_eq!(h.queue.len(), 3);
        assert_eq!(h.manager.parked_count(), 0);
        assert_eq!(h.cache.snapshot().cash, Money::new(dec!(500)));
    }

    #[tokio::test]
    async fn replenish_without_parked_signal_is_noop() {
        let h = harness(ResumePolicy::default());
        let outcome = h
            .manager
            .on_liquidity_replenished(Money::new(dec!(12_000)), Money::new(dec!(60_000)), dec!(0.20))
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(h.cache.snapshot().buying_power, Money::new(dec!(12_000)));
    }

    #[tokio::test]
    async fn each_event_resumes_one_signal_oldest_first() {
        let h = harness(ResumePolicy::default());
        h.manager.submit_signal(signal("sig-1")).await.unwrap();
        h.manager.submit_signal(signal("sig-2")).await.unwrap();

        let first = h
            .manager
            .on_liquidity_replenished(Money::new(dec!(12_000)), Money::new(dec!(60_000)), dec!(0.20))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.signal.id(), &SignalId::new("sig-1"));
        assert_eq!(h.manager.parked_ids(), vec![SignalId::new("sig-2")]);
    }

    #[tokio::test]
    async fn parking_beyond_capacity_is_retryable() {
        let h = harness(ResumePolicy {
            max_parked: 1,
            ..ResumePolicy::default()
        });
        h.manager.submit_signal(signal("sig-1")).await.unwrap();

        let decision = h.manager.submit_signal(signal("sig-2")).await.unwrap();

        assert_eq!(decision.signal.state(), SignalState::RetryableFailure);
        assert_eq!(h.manager.parked_count(), 1);
        assert_eq!(h.broker.submitted.lock().len(), 1);
    }

    #[tokio::test]
    async fn vetoed_liquidity_sell_leaves_nothing_parked() {
        let h = harness(ResumePolicy::default());
        assert!(h.cache.on_account_value("ExcessLiquidity", "3000"));

        let decision = h.manager.submit_signal(signal("sig-1")).await.unwrap();

        assert_eq!(decision.signal.state(), SignalState::RetryableFailure);
        assert!(decision.signal.failure_reason().unwrap().contains("not dispatched"));
        assert_eq!(h.manager.parked_count(), 0);
        assert!(h.broker.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn stale_parked_signals_expire_to_retryable() {
        let h = harness(ResumePolicy::default());
        h.manager.submit_signal(signal("sig-1")).await.unwrap();

        assert!(h.manager.expire_stale(Instant::now()).is_empty());
        let expired = h.manager.expire_stale(Instant::now() + Duration::from_secs(301));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].state(), SignalState::RetryableFailure);
        assert_eq!(h.manager.parked_count(), 0);
        assert_eq!(
            h.manager.signal(&SignalId::new("sig-1")).unwrap().state(),
            SignalState::RetryableFailure
        );
    }

    #[tokio::test]
    async fn retry_re_evaluates_retryable_signal() {
        let h = harness(ResumePolicy::default());
        h.manager.submit_signal(signal("sig-1")).await.unwrap();
        h.manager.expire_stale(Instant::now() + Duration::from_secs(301));

        h.cache
            .apply_liquidity_refresh(Money::new(dec!(50_000)), Money::new(dec!(60_000)), dec!(0.30));
        let decision = h.manager.retry(&SignalId::new("sig-1")).await.unwrap();

        assert_eq!(decision.signal.state(), SignalState::Complete);
        assert!(h.manager.signal(&SignalId::new("sig-1")).is_none());
        assert!(matches!(
            h.manager.retry(&SignalId::new("sig-1")).await,
            Err(AdmissionError::UnknownSignal(_))
        ));
    }

    #[tokio::test]
    async fn fatal_signals_are_not_kept() {
        let h = harness_with(
            ResumePolicy::default(),
            AdmissionPolicy {
                max_liquidity_cycles: 1,
                ..AdmissionPolicy::default()
            },
        );
        h.manager.submit_signal(signal("sig-1")).await.unwrap();
        assert_eq!(h.manager.tracked_count(), 1);

        let decision = h
            .manager
            .on_liquidity_replenished(Money::new(dec!(5_000)), Money::new(dec!(60_000)), dec!(0.20))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(decision.signal.state(), SignalState::FatalFailure);
        assert!(h.manager.signal(&SignalId::new("sig-1")).is_none());
        assert_eq!(h.manager.tracked_count(), 0);
    }

    #[tokio::test]
    async fn unretried_signals_are_forgotten_after_the_retry_window() {
        let h = harness(ResumePolicy {
            max_parked: 1,
            ..ResumePolicy::default()
        });
        h.manager.submit_signal(signal("sig-1")).await.unwrap();
        let rejected = h.manager.submit_signal(signal("sig-2")).await.unwrap();
        assert_eq!(rejected.signal.state(), SignalState::RetryableFailure);

        let now = Instant::now();
        h.manager.expire_stale(now + Duration::from_secs(299));
        assert!(h.manager.signal(&SignalId::new("sig-2")).is_some());

        // sig-1 expires to retryable in this sweep and gets a fresh window
        h.manager.expire_stale(now + Duration::from_secs(601));
        assert!(h.manager.signal(&SignalId::new("sig-2")).is_none());
        assert_eq!(
            h.manager.signal(&SignalId::new("sig-1")).unwrap().state(),
            SignalState::RetryableFailure
        );
        assert!(matches!(
            h.manager.retry(&SignalId::new("sig-2")).await,
            Err(AdmissionError::UnknownSignal(_))
        ));
    }

    #[tokio::test]
    async fn resubmission_is_sized_against_capital_net_of_in_flight() {
        let h = harness(ResumePolicy::default());
        h.cache
            .apply_liquidity_refresh(Money::new(dec!(20_000)), Money::new(dec!(60_000)), dec!(0.20));
        let stepped_down = QueuedOrder {
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            quantity: Quantity::from_u64(150),
            kind: crate::domain::dispatch::OrderKind::Market,
            transaction_id: TransactionId::new("sig-9-frag-1"),
            origin: crate::domain::dispatch::OrderOrigin::Fragment,
        };

        // 90% of 20_000 buys 180 shares at 100
        let admitted = h.manager.resubmit(&stepped_down).unwrap();
        assert_eq!(admitted.quantity, Quantity::from_u64(150));
        assert_eq!(h.queue.len(), 1);

        // 15_000 in flight leaves 5_000: SAFE_MODE, 15% of it buys 7 shares
        h.manager.gateway.submit(&stepped_down).await.unwrap();
        let admitted = h.manager.resubmit(&stepped_down).unwrap();
        assert_eq!(admitted.quantity, Quantity::from_u64(7));
        assert_eq!(h.queue.len(), 2);
    }
}
