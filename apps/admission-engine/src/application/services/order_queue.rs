//! Serialized Order Queue
//!
//! Bounded FIFO between producers (admission, the principal) and a single
//! consumer that hands orders to the dispatch gateway one at a time.
//!
//! The consumer waits on the queue with a short timeout so it notices
//! shutdown within one poll interval. An order whose quantity is not a whole
//! number of shares is dropped at dequeue time, never rounded.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::application::ports::BrokerPort;
use crate::application::services::DispatchGateway;
use crate::domain::dispatch::{DispatchError, QueuedOrder};

/// Queue sizing and polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueuePolicy {
    /// Maximum queued orders.
    pub capacity: usize,
    /// Dequeue wait before re-checking for shutdown (milliseconds).
    pub poll_timeout_ms: u64,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            capacity: 256,
            poll_timeout_ms: 1000,
        }
    }
}

impl QueuePolicy {
    /// Poll timeout as a duration.
    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

/// Producer handle of the order queue.
#[derive(Debug, Clone)]
pub struct SerializedOrderQueue {
    tx: mpsc::Sender<QueuedOrder>,
    capacity: usize,
}

/// Consumer end of the order queue.
#[derive(Debug)]
pub struct OrderQueueReceiver {
    rx: mpsc::Receiver<QueuedOrder>,
}

impl SerializedOrderQueue {
    /// Create a queue and its single consumer end.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, OrderQueueReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, OrderQueueReceiver { rx })
    }

    /// Enqueue without waiting.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` at capacity and `QueueClosed` once the consumer is gone.
    pub fn enqueue(&self, order: QueuedOrder) -> Result<(), DispatchError> {
        self.tx.try_send(order).map_err(|e| match e {
            TrySendError::Full(order) => {
                tracing::warn!(
                    symbol = %order.symbol,
                    transaction_id = %order.transaction_id,
                    capacity = self.capacity,
                    "Order queue full"
                );
                DispatchError::QueueFull
            }
            TrySendError::Closed(_) => DispatchError::QueueClosed,
        })
    }

    /// Orders currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    /// Returns true if nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters reported when the dispatch loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchLoopStats {
    /// Orders handed to the broker.
    pub dispatched: u64,
    /// Orders dropped for a non-whole quantity.
    pub invalid_quantity: u64,
    /// Orders stopped by the margin veto.
    pub vetoed: u64,
    /// Orders that failed for any other reason.
    pub failed: u64,
}

/// Single consumer draining the queue into the dispatch gateway.
pub struct OrderDispatchLoop<B>
where
    B: BrokerPort + 'static,
{
    rx: OrderQueueReceiver,
    gateway: Arc<DispatchGateway<B>>,
    poll_timeout: Duration,
    shutdown: CancellationToken,
}

impl<B> OrderDispatchLoop<B>
where
    B: BrokerPort + 'static,
{
    /// Create the consumer loop.
    pub fn new(
        rx: OrderQueueReceiver,
        gateway: Arc<DispatchGateway<B>>,
        poll_timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            rx,
            gateway,
            poll_timeout,
            shutdown,
        }
    }

    /// Run until shutdown or until every producer is gone.
    pub async fn run(mut self) -> DispatchLoopStats {
        let mut stats = DispatchLoopStats::default();
        tracing::info!(
            poll_timeout_ms = self.poll_timeout.as_millis() as u64,
            "Order dispatch loop started"
        );

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    tracing::info!("Order dispatch loop shutting down");
                    break;
                }
                received = tokio::time::timeout(self.poll_timeout, self.rx.rx.recv()) => {
                    match received {
                        Ok(Some(order)) => self.dispatch(&order, &mut stats).await,
                        Ok(None) => {
                            tracing::info!("Order queue closed");
                            break;
                        }
                        Err(_) => {}
                    }
                }
            }
        }

        tracing::info!(
            dispatched = stats.dispatched,
            invalid_quantity = stats.invalid_quantity,
            vetoed = stats.vetoed,
            failed = stats.failed,
            "Order dispatch loop stopped"
        );
        stats
    }

    async fn dispatch(&self, order: &QueuedOrder, stats: &mut DispatchLoopStats) {
        if let Err(e) = order.quantity.whole_units() {
            tracing::error!(
                symbol = %order.symbol,
                quantity = %order.quantity,
                transaction_id = %order.transaction_id,
                error = %e,
                "Dropping order with non-whole quantity"
            );
            stats.invalid_quantity += 1;
            return;
        }

        match self.gateway.submit(order).await {
            Ok(_) => stats.dispatched += 1,
            Err(e) if e.is_veto() => stats.vetoed += 1,
            Err(e) => {
                tracing::error!(
                    symbol = %order.symbol,
                    transaction_id = %order.transaction_id,
                    error = %e,
                    "Queued order not dispatched"
                );
                stats.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{BrokerError, Contract, NoOpNotifier, NoPriceSource, OrderSpec};
    use crate::application::services::{AccountStateCache, DispatchPolicy};
    use crate::domain::capital::CapitalSnapshot;
    use crate::domain::dispatch::{OrderKind, OrderOrigin, OrderSide};
    use crate::domain::shared::{BrokerOrderId, Money, Quantity, Symbol, TransactionId};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use tokio_test::{assert_pending, assert_ready};

    #[derive(Default)]
    struct RecordingBroker {
        submitted: Mutex<Vec<(BrokerOrderId, u64)>>,
    }

    #[async_trait]
    impl BrokerPort for RecordingBroker {
        async fn submit_order(
            &self,
            order_id: BrokerOrderId,
            _contract: &Contract,
            spec: &OrderSpec,
        ) -> Result<(), BrokerError> {
            self.submitted.lock().push((order_id, spec.total_quantity));
            Ok(())
        }
    }

    fn order(symbol: &str, quantity: Quantity) -> QueuedOrder {
        QueuedOrder {
            symbol: Symbol::new(symbol),
            side: OrderSide::Buy,
            quantity,
            kind: OrderKind::Market,
            transaction_id: TransactionId::new(format!("{symbol}-tx")),
            origin: OrderOrigin::External,
        }
    }

    fn gateway(broker: Arc<RecordingBroker>) -> Arc<DispatchGateway<RecordingBroker>> {
        let cache = Arc::new(AccountStateCache::with_snapshot(CapitalSnapshot::new(
            Money::new(dec!(50_000)),
            Money::new(dec!(100_000)),
            Money::new(dec!(10_000)),
            Money::new(dec!(30_000)),
            dec!(0.30),
        )));
        Arc::new(DispatchGateway::new(
            broker,
            cache,
            Arc::new(NoPriceSource),
            Arc::new(NoOpNotifier),
            DispatchPolicy::default(),
        ))
    }

    #[test]
    fn enqueue_reports_full_and_closed() {
        let (queue, rx) = SerializedOrderQueue::new(1);
        queue.enqueue(order("AAPL", Quantity::from_u64(1))).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(matches!(
            queue.enqueue(order("MSFT", Quantity::from_u64(1))),
            Err(DispatchError::QueueFull)
        ));

        drop(rx);
        assert!(matches!(
            queue.enqueue(order("MSFT", Quantity::from_u64(1))),
            Err(DispatchError::QueueClosed)
        ));
    }

    #[test]
    fn waiting_consumer_is_woken_by_enqueue() {
        let (queue, mut rx) = SerializedOrderQueue::new(2);
        let mut next = tokio_test::task::spawn(rx.rx.recv());
        assert_pending!(next.poll());

        queue.enqueue(order("AAPL", Quantity::from_u64(3))).unwrap();

        assert!(next.is_woken());
        let received = assert_ready!(next.poll()).unwrap();
        assert_eq!(received.transaction_id, TransactionId::new("AAPL-tx"));
    }

    #[tokio::test]
    async fn dispatches_in_fifo_order_with_sequential_ids() {
        let broker = Arc::new(RecordingBroker::default());
        let (queue, rx) = SerializedOrderQueue::new(8);
        for qty in [5, 6, 7] {
            queue.enqueue(order("AAPL", Quantity::from_u64(qty))).unwrap();
        }
        drop(queue);

        let stats = OrderDispatchLoop::new(
            rx,
            gateway(Arc::clone(&broker)),
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .run()
        .await;

        assert_eq!(stats.dispatched, 3);
        assert_eq!(
            *broker.submitted.lock(),
            vec![
                (BrokerOrderId::new(1), 5),
                (BrokerOrderId::new(2), 6),
                (BrokerOrderId::new(3), 7),
            ]
        );
    }

    #[tokio::test]
    async fn fractional_order_is_dropped_not_rounded() {
        let broker = Arc::new(RecordingBroker::default());
        let (queue, rx) = SerializedOrderQueue::new(8);
        queue.enqueue(order("AAPL", Quantity::new(dec!(12.333333)))).unwrap();
        queue.enqueue(order("MSFT", Quantity::from_u64(12))).unwrap();
        drop(queue);

        let stats = OrderDispatchLoop::new(
            rx,
            gateway(Arc::clone(&broker)),
            Duration::from_millis(10),
            CancellationToken::new(),
        )
        .run()
        .await;

        assert_eq!(stats.invalid_quantity, 1);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(*broker.submitted.lock(), vec![(BrokerOrderId::new(1), 12)]);
    }

    #[tokio::test]
    async fn exits_promptly_on_shutdown() {
        let broker = Arc::new(RecordingBroker::default());
        let (_queue, rx) = SerializedOrderQueue::new(8);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(
            OrderDispatchLoop::new(rx, gateway(broker), Duration::from_millis(50), shutdown.clone()).run(),
        );
        shutdown.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats, DispatchLoopStats::default());
    }
}
