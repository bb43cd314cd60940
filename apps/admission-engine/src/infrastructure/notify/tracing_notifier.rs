//! Notifier that writes every notification to the log.

use crate::application::ports::{AlertLevel, ExecutionReport, NotifierPort, OrderRejection};

/// Logs notifications as structured events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotifierPort for TracingNotifier {
    fn notify_execution_report(&self, report: &ExecutionReport) {
        tracing::info!(
            target: "admission_engine::notify",
            broker_order_id = %report.broker_order_id,
            symbol = %report.symbol,
            side = %report.side,
            quantity = %report.quantity,
            price = %report.price,
            transaction_id = ?report.transaction_id,
            "Execution report"
        );
    }

    fn notify_order_rejected(&self, rejection: &OrderRejection) {
        tracing::warn!(
            target: "admission_engine::notify",
            broker_order_id = %rejection.broker_order_id,
            symbol = %rejection.symbol,
            code = rejection.code,
            reason = %rejection.message,
            "Order rejected"
        );
    }

    fn notify_liquidity_alert(&self, level: AlertLevel, message: &str) {
        match level {
            AlertLevel::Info => tracing::info!(target: "admission_engine::notify", %level, alert = message, "Liquidity alert"),
            AlertLevel::Warning => tracing::warn!(target: "admission_engine::notify", %level, alert = message, "Liquidity alert"),
            AlertLevel::Critical => {
                tracing::error!(target: "admission_engine::notify", %level, alert = message, "Liquidity alert");
            }
        }
    }
}
