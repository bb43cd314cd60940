//! Notifier that hands notifications to a consumer task.
//!
//! Sends never wait: when the consumer falls behind the notification is
//! dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::application::ports::{AlertLevel, ExecutionReport, NotifierPort, OrderRejection};

/// An outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A fill.
    ExecutionReport(ExecutionReport),
    /// A final rejection.
    OrderRejected(OrderRejection),
    /// A liquidity alert.
    LiquidityAlert {
        /// Severity.
        level: AlertLevel,
        /// Alert text.
        message: String,
    },
}

impl Notification {
    /// Hand this notification to another notifier.
    pub fn deliver(&self, sink: &dyn NotifierPort) {
        match self {
            Self::ExecutionReport(report) => sink.notify_execution_report(report),
            Self::OrderRejected(rejection) => sink.notify_order_rejected(rejection),
            Self::LiquidityAlert { level, message } => sink.notify_liquidity_alert(*level, message),
        }
    }
}

/// Non-blocking channel notifier.
#[derive(Debug)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
    dropped: AtomicU64,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Notifications dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "Notification dropped");
        }
    }
}

impl NotifierPort for ChannelNotifier {
    fn notify_execution_report(&self, report: &ExecutionReport) {
        self.send(Notification::ExecutionReport(report.clone()));
    }

    fn notify_order_rejected(&self, rejection: &OrderRejection) {
        self.send(Notification::OrderRejected(rejection.clone()));
    }

    fn notify_liquidity_alert(&self, level: AlertLevel, message: &str) {
        self.send(Notification::LiquidityAlert {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockNotifierPort;
    use crate::domain::shared::{BrokerOrderId, Symbol};

    #[test]
    fn delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new(4);
        notifier.notify_liquidity_alert(AlertLevel::Warning, "low");
        notifier.notify_order_rejected(&OrderRejection {
            broker_order_id: BrokerOrderId::new(7),
            symbol: Symbol::new("AAPL"),
            code: 110,
            message: "price out of range".to_string(),
        });

        assert!(matches!(
            rx.try_recv().unwrap(),
            Notification::LiquidityAlert { level: AlertLevel::Warning, .. }
        ));
        assert!(matches!(rx.try_recv().unwrap(), Notification::OrderRejected(r) if r.code == 110));
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (notifier, _rx) = ChannelNotifier::new(1);
        notifier.notify_liquidity_alert(AlertLevel::Info, "first");
        notifier.notify_liquidity_alert(AlertLevel::Info, "second");

        assert_eq!(notifier.dropped(), 1);
    }

    #[test]
    fn wire_format_is_tagged() {
        let json = serde_json::to_value(Notification::LiquidityAlert {
            level: AlertLevel::Critical,
            message: "abandoned".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "liquidity_alert");
        assert_eq!(json["level"], "CRITICAL");
    }

    #[test]
    fn deliver_forwards_to_the_matching_call() {
        let mut sink = MockNotifierPort::new();
        sink.expect_notify_liquidity_alert()
            .withf(|level, message| *level == AlertLevel::Critical && message.contains("abandoned"))
            .times(1)
            .return_const(());
        sink.expect_notify_order_rejected()
            .withf(|r| r.code == 201)
            .times(1)
            .return_const(());

        Notification::LiquidityAlert {
            level: AlertLevel::Critical,
            message: "abandoned".to_string(),
        }
        .deliver(&sink);
        Notification::OrderRejected(OrderRejection {
            broker_order_id: BrokerOrderId::new(3),
            symbol: Symbol::new("AAPL"),
            code: 201,
            message: "insufficient margin".to_string(),
        })
        .deliver(&sink);
    }
}
