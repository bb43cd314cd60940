//! Dependency Injection Container
//!
//! Manages creation and wiring of all application components.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{BrokerPort, NotifierPort, ReferencePriceSource};
use crate::application::services::{
    AccountStateCache, DispatchGateway, OrderDispatchLoop, OrderQueueReceiver, RecoveryDirective,
    SerializedOrderQueue,
};
use crate::application::use_cases::{AdmissionOrchestrator, OrderFlowManager};
use crate::config::AdmissionConfig;
use crate::domain::admission::EqualSplit;
use crate::domain::liquidity::{LiquidityClassifier, LiquidityGenerator};
use crate::infrastructure::bridge::{self, BrokerEventBridge, BrokerEventReceiver};
use crate::infrastructure::broker::PaperBroker;
use crate::infrastructure::intake::SignalIntake;
use crate::infrastructure::price_feed::QuoteBook;

/// Dependency injection container.
///
/// Holds all wired dependencies for the application. Every component shares
/// one capital cache, one quote book and one dispatch gateway.
pub struct Container<B>
where
    B: BrokerPort + 'static,
{
    config: AdmissionConfig,

    // Ports
    broker: Arc<B>,
    notifier: Arc<dyn NotifierPort>,

    // Shared state
    cache: Arc<AccountStateCache>,
    quotes: Arc<QuoteBook>,

    // Services
    gateway: Arc<DispatchGateway<B>>,
    queue: SerializedOrderQueue,
    queue_rx: Mutex<Option<OrderQueueReceiver>>,
    flow: Arc<OrderFlowManager<B>>,
}

impl<B> Container<B>
where
    B: BrokerPort + 'static,
{
    /// Create a new container with all dependencies.
    pub fn new(config: AdmissionConfig, broker: Arc<B>, notifier: Arc<dyn NotifierPort>) -> Self {
        let cache = Arc::new(AccountStateCache::new());
        let quotes = Arc::new(QuoteBook::new());
        let prices: Arc<dyn ReferencePriceSource> = Arc::clone(&quotes) as Arc<dyn ReferencePriceSource>;

        let gateway = Arc::new(DispatchGateway::new(
            Arc::clone(&broker),
            Arc::clone(&cache),
            Arc::clone(&prices),
            Arc::clone(&notifier),
            config.dispatch.clone(),
        ));

        let (queue, queue_rx) = SerializedOrderQueue::new(config.queue.capacity);

        let orchestrator = Self::build_orchestrator(&config, prices, Arc::clone(&notifier));
        let flow = Arc::new(OrderFlowManager::new(
            orchestrator,
            Arc::clone(&cache),
            Arc::clone(&gateway),
            queue.clone(),
            config.resume,
        ));

        Self {
            config,
            broker,
            notifier,
            cache,
            quotes,
            gateway,
            queue,
            queue_rx: Mutex::new(Some(queue_rx)),
            flow,
        }
    }

    fn build_orchestrator(
        config: &AdmissionConfig,
        prices: Arc<dyn ReferencePriceSource>,
        notifier: Arc<dyn NotifierPort>,
    ) -> AdmissionOrchestrator {
        AdmissionOrchestrator::new(
            LiquidityClassifier::new(config.liquidity),
            LiquidityGenerator::new(config.generator),
            Arc::new(EqualSplit::new(config.admission.fragment_count)),
            prices,
            notifier,
            config.admission,
        )
    }

    /// Get the configuration.
    pub const fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Get the broker port.
    pub fn broker(&self) -> Arc<B> {
        Arc::clone(&self.broker)
    }

    /// Get the notifier port.
    pub fn notifier(&self) -> Arc<dyn NotifierPort> {
        Arc::clone(&self.notifier)
    }

    /// Get the capital cache.
    pub fn cache(&self) -> Arc<AccountStateCache> {
        Arc::clone(&self.cache)
    }

    /// Get the quote book.
    pub fn quotes(&self) -> Arc<QuoteBook> {
        Arc::clone(&self.quotes)
    }

    /// Get the dispatch gateway.
    pub fn gateway(&self) -> Arc<DispatchGateway<B>> {
        Arc::clone(&self.gateway)
    }

    /// Get a producer handle of the order queue.
    pub fn queue(&self) -> SerializedOrderQueue {
        self.queue.clone()
    }

    /// Get the order flow manager.
    pub fn flow(&self) -> Arc<OrderFlowManager<B>> {
        Arc::clone(&self.flow)
    }

    /// Create a standalone `AdmissionOrchestrator` with the configured policies.
    pub fn orchestrator(&self) -> AdmissionOrchestrator {
        Self::build_orchestrator(
            &self.config,
            Arc::clone(&self.quotes) as Arc<dyn ReferencePriceSource>,
            Arc::clone(&self.notifier),
        )
    }

    /// Create the order dispatch loop.
    ///
    /// The queue has a single consumer, so this returns `None` after the
    /// first call.
    pub fn dispatch_loop(&self, shutdown: CancellationToken) -> Option<OrderDispatchLoop<B>> {
        let rx = self.queue_rx.lock().take()?;
        Some(OrderDispatchLoop::new(
            rx,
            Arc::clone(&self.gateway),
            self.config.queue.poll_timeout(),
            shutdown,
        ))
    }

    /// Create the broker event bridge.
    pub fn event_bridge(
        &self,
        events: BrokerEventReceiver,
        directives: mpsc::Sender<RecoveryDirective>,
        shutdown: CancellationToken,
    ) -> BrokerEventBridge<B> {
        BrokerEventBridge::new(
            events,
            Arc::clone(&self.cache),
            Arc::clone(&self.gateway),
            Arc::clone(&self.flow),
            Arc::clone(&self.quotes),
            directives,
            shutdown,
        )
    }

    /// Create the signal intake.
    pub fn signal_intake(&self, shutdown: CancellationToken) -> SignalIntake<B> {
        SignalIntake::new(Arc::clone(&self.flow), shutdown)
    }
}

impl Container<PaperBroker> {
    /// Wire a container around a paper broker seeded from `config.paper`.
    ///
    /// Returns the receiving end of the broker event channel for the bridge.
    pub fn paper(config: AdmissionConfig, notifier: Arc<dyn NotifierPort>) -> (Self, BrokerEventReceiver) {
        let (events_tx, events_rx) = bridge::channel(config.channels.broker_events);
        let broker = Arc::new(PaperBroker::new(&config.paper, events_tx));
        (Self::new(config, broker, notifier), events_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::NoOpNotifier;

    #[test]
    fn wires_shared_components() {
        let (container, _events) = Container::paper(AdmissionConfig::default(), Arc::new(NoOpNotifier));

        assert!(Arc::ptr_eq(&container.cache(), &container.cache()));
        assert_eq!(container.gateway().policy(), &container.config().dispatch);
        assert!(container.queue().is_empty());
        assert_eq!(container.flow().parked_count(), 0);
    }

    #[test]
    fn dispatch_loop_is_created_once() {
        let (container, _events) = Container::paper(AdmissionConfig::default(), Arc::new(NoOpNotifier));
        let shutdown = CancellationToken::new();

        assert!(container.dispatch_loop(shutdown.clone()).is_some());
        assert!(container.dispatch_loop(shutdown).is_none());
    }
}
