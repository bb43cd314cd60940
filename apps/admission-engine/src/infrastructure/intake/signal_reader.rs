//! JSON-lines buy signal intake.
//!
//! One request per line:
//!
//! ```json
//! {"symbol": "AAPL", "total_cost": "10000", "max_price": "150.25"}
//! ```
//!
//! `max_price` is optional; without it the signal is a market buy. Blank
//! lines and lines starting with `#` are skipped. A malformed line is logged
//! and skipped; it never stops the reader.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::application::ports::BrokerPort;
use crate::application::use_cases::OrderFlowManager;
use crate::domain::admission::{BuySignal, PriceCeiling};
use crate::domain::shared::{DomainError, Money, SignalId, Symbol};

/// A buy request as read from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuyRequest {
    /// Ticker.
    pub symbol: String,
    /// Notional to buy.
    pub total_cost: Decimal,
    /// Optional limit ceiling.
    #[serde(default)]
    pub max_price: Option<Decimal>,
    /// Caller-chosen id; generated when absent.
    #[serde(default)]
    pub signal_id: Option<String>,
}

impl BuyRequest {
    /// Build a pending buy signal.
    ///
    /// # Errors
    ///
    /// Returns error if the symbol, cost or ceiling is invalid.
    pub fn into_signal(self) -> Result<BuySignal, DomainError> {
        let id = self.signal_id.map_or_else(SignalId::generate, SignalId::new);
        let price = self.max_price.map_or(PriceCeiling::Market, PriceCeiling::Limit);
        BuySignal::new(id, Symbol::new(self.symbol), Money::new(self.total_cost), price)
    }
}

/// Intake errors for a single line.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Not a valid request.
    #[error("Malformed buy request: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Well-formed but invalid.
    #[error("Invalid buy request: {0}")]
    Invalid(#[from] DomainError),
}

/// Parse one line. Blank and comment lines yield `None`.
///
/// # Errors
///
/// Returns error if the line is not a valid buy request.
pub fn parse_line(line: &str) -> Result<Option<BuySignal>, IntakeError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let request: BuyRequest = serde_json::from_str(line)?;
    Ok(Some(request.into_signal()?))
}

/// Counters reported when the intake stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeStats {
    /// Signals handed to the flow manager.
    pub submitted: u64,
    /// Lines rejected before submission.
    pub rejected: u64,
}

/// Reads buy requests and submits them for admission.
pub struct SignalIntake<B>
where
    B: BrokerPort + 'static,
{
    flow: Arc<OrderFlowManager<B>>,
    shutdown: CancellationToken,
}

impl<B> SignalIntake<B>
where
    B: BrokerPort + 'static,
{
    /// Create an intake bound to a flow manager.
    pub fn new(flow: Arc<OrderFlowManager<B>>, shutdown: CancellationToken) -> Self {
        Self { flow, shutdown }
    }

    /// Read until end of input or shutdown.
    pub async fn run<R>(self, reader: R) -> IntakeStats
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = IntakeStats::default();
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                line = lines.next_line() => line,
            };
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::info!("Signal input closed");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Signal input failed");
                    break;
                }
            };

            let signal = match parse_line(&line) {
                Ok(Some(signal)) => signal,
                Ok(None) => continue,
                Err(e) => {
                    stats.rejected += 1;
                    tracing::warn!(error = %e, line = %line, "Skipping buy request");
                    continue;
                }
            };

            let id = signal.id().clone();
            match self.flow.submit_signal(signal).await {
                Ok(decision) => {
                    stats.submitted += 1;
                    tracing::info!(
                        signal_id = %id,
                        state = %decision.signal.state(),
                        fragments = decision.fragments.len(),
                        "Signal admitted"
                    );
                }
                Err(e) => {
                    stats.rejected += 1;
                    tracing::warn!(signal_id = %id, error = %e, "Signal not evaluated");
                }
            }
        }

        tracing::info!(submitted = stats.submitted, rejected = stats.rejected, "Signal intake stopped");
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn parses_limit_request() {
        let signal = parse_line(r#"{"symbol":"aapl","total_cost":"10000","max_price":"150.25","signal_id":"s-1"}"#)
            .unwrap()
            .unwrap();

        assert_eq!(signal.id(), &SignalId::new("s-1"));
        assert_eq!(signal.symbol().as_str(), "AAPL");
        assert_eq!(signal.total_cost(), Money::new(dec!(10000)));
        assert_eq!(signal.price(), PriceCeiling::Limit(dec!(150.25)));
    }

    #[test]
    fn missing_price_is_market() {
        let signal = parse_line(r#"{"symbol":"MSFT","total_cost":2500}"#).unwrap().unwrap();
        assert_eq!(signal.price(), PriceCeiling::Market);
    }

    #[test_case("" ; "blank")]
    #[test_case("   " ; "whitespace")]
    #[test_case("# comment" ; "comment")]
    fn skips_non_requests(line: &str) {
        assert!(parse_line(line).unwrap().is_none());
    }

    #[test_case(r#"{"symbol":"AAPL"}"# ; "missing cost")]
    #[test_case("not json" ; "garbage")]
    #[test_case(r#"{"symbol":"AAPL","total_cost":"1","side":"SELL"}"# ; "unknown field")]
    fn rejects_malformed(line: &str) {
        assert!(matches!(parse_line(line), Err(IntakeError::Malformed(_))));
    }

    #[test_case(r#"{"symbol":"AAPL","total_cost":"0"}"# ; "zero cost")]
    #[test_case(r#"{"symbol":"AAPL","total_cost":"0.0000000000000000000000000001"}"# ; "sub cent cost")]
    #[test_case(r#"{"symbol":"AAPL","total_cost":"20000000"}"# ; "cost above order cap")]
    #[test_case(r#"{"symbol":"AAPL","total_cost":"100","max_price":"-1"}"# ; "negative ceiling")]
    fn rejects_invalid(line: &str) {
        assert!(matches!(parse_line(line), Err(IntakeError::Invalid(_))));
    }
}
