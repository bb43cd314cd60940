//! Broker Event Bridge
//!
//! Single task that applies broker callbacks to the core. Broker threads only
//! push `BrokerEvent`s onto a channel; every state change happens here, in
//! arrival order.
//!
//! A filled liquidity-generation sell arms a replenishment. The next
//! account-summary end, which carries the post-sale capital figures, resumes
//! one parked signal per armed fill.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::application::ports::BrokerPort;
use crate::application::services::{AccountStateCache, DispatchGateway, RecoveryDirective};
use crate::application::use_cases::OrderFlowManager;
use crate::domain::dispatch::{OrderOrigin, OrderSide};
use crate::infrastructure::bridge::{BrokerEvent, BrokerEventReceiver};
use crate::infrastructure::price_feed::QuoteBook;

/// Counters reported when the bridge exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Events applied.
    pub events: u64,
    /// Parked signals resumed.
    pub resumed: u64,
    /// Recovery directives forwarded.
    pub directives: u64,
    /// Recovery directives dropped because the principal was not keeping up.
    pub dropped_directives: u64,
}

/// Applies broker events to the cache, the gateway and the flow manager.
pub struct BrokerEventBridge<B>
where
    B: BrokerPort + 'static,
{
    events: BrokerEventReceiver,
    cache: Arc<AccountStateCache>,
    gateway: Arc<DispatchGateway<B>>,
    flow: Arc<OrderFlowManager<B>>,
    quotes: Arc<QuoteBook>,
    directives: mpsc::Sender<RecoveryDirective>,
    shutdown: CancellationToken,
    armed_replenishments: usize,
    stats: BridgeStats,
}

impl<B> BrokerEventBridge<B>
where
    B: BrokerPort + 'static,
{
    /// Create the bridge.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: BrokerEventReceiver,
        cache: Arc<AccountStateCache>,
        gateway: Arc<DispatchGateway<B>>,
        flow: Arc<OrderFlowManager<B>>,
        quotes: Arc<QuoteBook>,
        directives: mpsc::Sender<RecoveryDirective>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            events,
            cache,
            gateway,
            flow,
            quotes,
            directives,
            shutdown,
            armed_replenishments: 0,
            stats: BridgeStats::default(),
        }
    }

    /// Run until shutdown or until every event sender is gone.
    pub async fn run(mut self) -> BridgeStats {
        tracing::info!("Broker event bridge started");

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    tracing::info!("Broker event bridge shutting down");
                    break;
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        tracing::info!("Broker event channel closed");
                        break;
                    };
                    self.apply(event).await;
                }
            }
        }

        tracing::info!(
            events = self.stats.events,
            resumed = self.stats.resumed,
            directives = self.stats.directives,
            dropped_directives = self.stats.dropped_directives,
            "Broker event bridge stopped"
        );
        self.stats
    }

    async fn apply(&mut self, event: BrokerEvent) {
        self.stats.events += 1;
        match event {
            BrokerEvent::AccountValue { tag, value } => {
                self.cache.on_account_value(&tag, &value);
            }
            BrokerEvent::AccountSummaryEnd => self.replenish().await,
            BrokerEvent::Position(position) => self.cache.on_position(position),
            BrokerEvent::PositionEnd => {
                self.cache.on_position_snapshot_end();
            }
            BrokerEvent::OrderFilled(fill) => {
                let Some(progress) = self.gateway.on_order_filled(&fill) else {
                    return;
                };
                let reservation = progress.reservation();
                if progress.is_complete()
                    && reservation.origin == OrderOrigin::LiquidityGeneration
                    && reservation.side == OrderSide::Sell
                {
                    self.armed_replenishments += 1;
                    tracing::debug!(
                        broker_order_id = %fill.broker_order_id,
                        armed = self.armed_replenishments,
                        "Liquidity sell filled, awaiting account refresh"
                    );
                }
            }
            BrokerEvent::OrderRejected {
                broker_order_id,
                code,
                message,
            } => {
                if let Some(directive) = self.gateway.on_order_rejected(broker_order_id, code, &message) {
                    self.forward(directive);
                }
            }
            BrokerEvent::OpenOrders(open) => {
                let open: HashSet<_> = open.into_iter().collect();
                self.gateway.reconcile(&open);
            }
            BrokerEvent::Quote { symbol, price } => {
                self.quotes.update(symbol, price);
            }
        }
    }

    async fn replenish(&mut self) {
        let armed = std::mem::take(&mut self.armed_replenishments);
        for _ in 0..armed {
            let snapshot = self.cache.snapshot();
            match self
                .flow
                .on_liquidity_replenished(
                    snapshot.buying_power,
                    snapshot.net_liquidation_value,
                    snapshot.reserve_margin_fraction,
                )
                .await
            {
                Ok(Some(decision)) => {
                    self.stats.resumed += 1;
                    tracing::info!(
                        signal_id = %decision.signal.id(),
                        state = %decision.signal.state(),
                        fragments = decision.fragments.len(),
                        "Parked signal re-evaluated"
                    );
                }
                Ok(None) => {}
                Err(e) => tracing::error!(error = %e, "Resume failed"),
            }
        }
    }

    fn forward(&mut self, directive: RecoveryDirective) {
        match self.directives.try_send(directive) {
            Ok(()) => self.stats.directives += 1,
            Err(TrySendError::Full(directive) | TrySendError::Closed(directive)) => {
                self.stats.dropped_directives += 1;
                tracing::warn!(?directive, "Recovery directive dropped");
            }
        }
    }
}
