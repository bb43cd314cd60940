//! Dispatch Gateway
//!
//! Margin-protected submission path:
//!
//! 1. Whole-share check (fractional sizes are vetoed, never rounded)
//! 2. Pre-flight margin veto, before anything is reserved or sent
//! 3. In-flight reservation of `quantity x reference price`
//! 4. Broker submission under the next broker order id
//!
//! A failed submission rolls its reservation back before returning. Fills
//! and rejections arrive later as broker events. A partial fill shrinks the
//! reservation; the fill that completes the order, a rejection, or
//! reconciliation releases it.
//!
//! Submissions are serialized: the broker order id counter is held for the
//! whole broker call, so ids are handed out strictly in submission order.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::application::ports::{
    AlertLevel, BrokerPort, Contract, ExecutionReport, NotifierPort, OrderRejection, OrderSpec,
    ReferencePriceSource,
};
use crate::application::services::AccountStateCache;
use crate::domain::dispatch::{
    DispatchError, FillProgress, InFlightReservation, OrderSide, QueuedOrder, RecoveryCounter, ReservationBook,
    StepDownOutcome, StepDownPolicy,
};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, Money, Quantity, Symbol};

/// Dispatch thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchPolicy {
    /// Margin utilization above which every order is vetoed.
    pub veto_threshold: Decimal,
    /// Retained share of a margin-rejected quantity.
    pub step_down_factor: Decimal,
    /// Step-downs allowed per symbol before abandoning it.
    pub max_step_down_attempts: u32,
    /// Broker error codes that mean insufficient margin.
    pub margin_error_codes: Vec<i32>,
    /// Fallback reference price is `net liquidation value / divisor`.
    pub fallback_price_divisor: Decimal,
    /// First broker order id handed out.
    pub first_order_id: u64,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            veto_threshold: dec!(0.90),
            step_down_factor: dec!(0.60),
            max_step_down_attempts: 2,
            margin_error_codes: vec![201],
            fallback_price_divisor: dec!(100),
            first_order_id: 1,
        }
    }
}

impl DispatchPolicy {
    /// Step-down policy derived from these settings.
    #[must_use]
    pub const fn step_down(&self) -> StepDownPolicy {
        StepDownPolicy {
            factor: self.step_down_factor,
            max_attempts: self.max_step_down_attempts,
        }
    }

    /// Whether a broker error code means insufficient margin.
    #[must_use]
    pub fn is_margin_code(&self, code: i32) -> bool {
        self.margin_error_codes.contains(&code)
    }
}

/// A successfully submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// Reservation key.
    pub client_order_id: ClientOrderId,
    /// Identifier the order was sent under.
    pub broker_order_id: BrokerOrderId,
    /// Whole shares sent.
    pub quantity: u64,
    /// Price the reservation was valued at.
    pub reference_price: Decimal,
}

/// Fill reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFill {
    /// Filled order.
    pub broker_order_id: BrokerOrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Filled quantity.
    pub quantity: Quantity,
    /// Fill price.
    pub price: Decimal,
}

/// Recovery instruction for the principal after a margin rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryDirective {
    /// Resubmit this reduced order through admission.
    StepDown {
        /// The rejected order at its new target size.
        order: QueuedOrder,
        /// Attempt number for the symbol.
        attempt: u32,
    },
    /// Stop retrying the symbol.
    Abandoned {
        /// Instrument given up on.
        symbol: Symbol,
        /// Attempts made.
        attempts: u32,
    },
}

/// Margin-protected order submission.
pub struct DispatchGateway<B>
where
    B: BrokerPort + 'static,
{
    broker: Arc<B>,
    cache: Arc<AccountStateCache>,
    prices: Arc<dyn ReferencePriceSource>,
    notifier: Arc<dyn NotifierPort>,
    policy: DispatchPolicy,
    next_order_id: tokio::sync::Mutex<BrokerOrderId>,
    reservations: Mutex<ReservationBook>,
    recovery: Mutex<RecoveryCounter>,
}

impl<B> DispatchGateway<B>
where
    B: BrokerPort + 'static,
{
    /// Create a gateway.
    pub fn new(
        broker: Arc<B>,
        cache: Arc<AccountStateCache>,
        prices: Arc<dyn ReferencePriceSource>,
        notifier: Arc<dyn NotifierPort>,
        policy: DispatchPolicy,
    ) -> Self {
        Self {
            broker,
            cache,
            prices,
            notifier,
            next_order_id: tokio::sync::Mutex::new(BrokerOrderId::new(policy.first_order_id)),
            recovery: Mutex::new(RecoveryCounter::new(policy.step_down())),
            reservations: Mutex::new(ReservationBook::new()),
            policy,
        }
    }

    /// The policy in force.
    pub const fn policy(&self) -> &DispatchPolicy {
        &self.policy
    }

    /// Submit an order with margin protection.
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` for non-positive or fractional quantities
    /// - `Vetoed` when margin utilization is above the threshold
    /// - `NoReferencePrice` when the reservation cannot be valued
    /// - `Transport` when the broker call fails (the reservation is rolled back)
    pub async fn submit(&self, order: &QueuedOrder) -> Result<DispatchReceipt, DispatchError> {
        let quantity = order
            .quantity
            .whole_units()
            .map_err(|source| DispatchError::InvalidQuantity {
                symbol: order.symbol.clone(),
                source,
            })?;

        let snapshot = self.cache.snapshot();
        let utilization = snapshot.margin_utilization();
        if utilization > self.policy.veto_threshold {
            tracing::warn!(
                symbol = %order.symbol,
                side = %order.side,
                %utilization,
                threshold = %self.policy.veto_threshold,
                "Pre-flight margin veto"
            );
            return Err(DispatchError::Vetoed {
                utilization,
                threshold: self.policy.veto_threshold,
            });
        }

        let reference_price = self.reference_price(&order.symbol, snapshot.net_liquidation_value)?;
        let contract = Contract::stock(order.symbol.clone());
        let spec = OrderSpec::for_order(order, quantity);

        let mut next_id = self.next_order_id.lock().await;
        let broker_order_id = *next_id;
        *next_id = broker_order_id.next();

        let client_order_id = ClientOrderId::generate();
        self.reservations
            .lock()
            .insert(InFlightReservation {
                client_order_id: client_order_id.clone(),
                broker_order_id,
                symbol: order.symbol.clone(),
                side: order.side,
                kind: order.kind,
                reserved_quantity: quantity,
                filled_quantity: 0,
                reference_price,
                transaction_id: order.transaction_id.clone(),
                origin: order.origin,
            })
            .map_err(DispatchError::Reservation)?;

        if let Err(e) = self.broker.submit_order(broker_order_id, &contract, &spec).await {
            self.reservations.lock().release(&client_order_id);
            tracing::error!(
                %broker_order_id,
                symbol = %order.symbol,
                error = %e,
                "Broker submission failed, reservation rolled back"
            );
            return Err(DispatchError::Transport {
                broker_order_id,
                message: e.to_string(),
            });
        }
        drop(next_id);

        tracing::info!(
            %broker_order_id,
            %client_order_id,
            symbol = %order.symbol,
            side = %order.side,
            quantity,
            %reference_price,
            transaction_id = %order.transaction_id,
            "Order submitted"
        );

        Ok(DispatchReceipt {
            client_order_id,
            broker_order_id,
            quantity,
            reference_price,
        })
    }

    /// Apply a fill and report the execution.
    ///
    /// Every fill is reported. The reservation is released once the order is
    /// fully filled. Fills for unknown orders are logged and dropped.
    pub fn on_order_filled(&self, fill: &OrderFill) -> Option<FillProgress> {
        let Some(progress) = self
            .reservations
            .lock()
            .record_fill(fill.broker_order_id, fill.quantity)
        else {
            tracing::error!(
                broker_order_id = %fill.broker_order_id,
                symbol = %fill.symbol,
                "Fill for an order with no reservation, dropping"
            );
            return None;
        };
        let reservation = progress.reservation();
        self.recovery.lock().clear(&reservation.symbol);

        tracing::info!(
            broker_order_id = %fill.broker_order_id,
            symbol = %fill.symbol,
            side = %fill.side,
            quantity = %fill.quantity,
            price = %fill.price,
            remaining = reservation.remaining_quantity(),
            "Order filled"
        );
        self.notifier.notify_execution_report(&ExecutionReport {
            broker_order_id: fill.broker_order_id,
            symbol: fill.symbol.clone(),
            side: fill.side,
            quantity: fill.quantity,
            price: fill.price,
            transaction_id: Some(reservation.transaction_id.clone()),
        });
        Some(progress)
    }

    /// Handle a broker rejection.
    ///
    /// Margin rejections run the step-down path and yield a directive; other
    /// codes are reported as final rejections and yield `None`.
    pub fn on_order_rejected(
        &self,
        broker_order_id: BrokerOrderId,
        code: i32,
        message: &str,
    ) -> Option<RecoveryDirective> {
        let Some(reservation) = self.reservations.lock().release_by_broker(broker_order_id) else {
            tracing::error!(%broker_order_id, code, reason = message, "Rejection for an order with no reservation, dropping");
            return None;
        };

        if !self.policy.is_margin_code(code) {
            tracing::warn!(%broker_order_id, symbol = %reservation.symbol, code, reason = message, "Order rejected");
            self.notifier.notify_order_rejected(&OrderRejection {
                broker_order_id,
                symbol: reservation.symbol.clone(),
                code,
                message: message.to_string(),
            });
            return None;
        }

        let outcome = self
            .recovery
            .lock()
            .on_margin_rejection(&reservation.symbol, reservation.remaining_quantity());

        match outcome {
            StepDownOutcome::StepDown { quantity, attempt } => {
                tracing::warn!(
                    %broker_order_id,
                    symbol = %reservation.symbol,
                    from = reservation.remaining_quantity(),
                    to = quantity,
                    attempt,
                    "Margin rejection, stepping down"
                );
                Some(RecoveryDirective::StepDown {
                    order: reservation.resubmission(quantity),
                    attempt,
                })
            }
            StepDownOutcome::Abandon { attempts } => {
                tracing::error!(
                    %broker_order_id,
                    symbol = %reservation.symbol,
                    attempts,
                    "Margin recovery exhausted, abandoning symbol"
                );
                self.notifier.notify_order_rejected(&OrderRejection {
                    broker_order_id,
                    symbol: reservation.symbol.clone(),
                    code,
                    message: format!("abandoned after {attempts} margin rejections: {message}"),
                });
                self.notifier.notify_liquidity_alert(
                    AlertLevel::Critical,
                    &format!(
                        "Margin recovery for {} abandoned after {attempts} attempts",
                        reservation.symbol
                    ),
                );
                Some(RecoveryDirective::Abandoned {
                    symbol: reservation.symbol,
                    attempts,
                })
            }
        }
    }

    /// Release reservations whose orders the broker no longer reports as open.
    pub fn reconcile(&self, open_orders: &HashSet<BrokerOrderId>) -> Vec<InFlightReservation> {
        let released = self.reservations.lock().reconcile(open_orders);
        for reservation in &released {
            tracing::warn!(
                broker_order_id = %reservation.broker_order_id,
                symbol = %reservation.symbol,
                notional = %reservation.notional(),
                "Released dangling reservation"
            );
        }
        released
    }

    /// Notional held by in-flight buys.
    pub fn in_flight_buy_notional(&self) -> Money {
        self.reservations.lock().reserved_buy_notional()
    }

    /// Number of in-flight reservations.
    pub fn in_flight_count(&self) -> usize {
        self.reservations.lock().len()
    }

    /// The reservation for a broker order, if still in flight.
    pub fn reservation(&self, broker_order_id: BrokerOrderId) -> Option<InFlightReservation> {
        self.reservations.lock().get_by_broker(broker_order_id).cloned()
    }

    /// Step-down attempts recorded for a symbol.
    pub fn recovery_attempts(&self, symbol: &Symbol) -> u32 {
        self.recovery.lock().attempts(symbol)
    }

    fn reference_price(&self, symbol: &Symbol, net_liquidation_value: Money) -> Result<Decimal, DispatchError> {
        if let Some(price) = self.prices.reference_price(symbol).filter(|p| *p > Decimal::ZERO) {
            return Ok(price);
        }
        let fallback = if self.policy.fallback_price_divisor > Decimal::ZERO {
            net_liquidation_value.amount() / self.policy.fallback_price_divisor
        } else {
            Decimal::ZERO
        };
        if fallback <= Decimal::ZERO {
            return Err(DispatchError::NoReferencePrice { symbol: symbol.clone() });
        }
        tracing::debug!(%symbol, %fallback, "No live price, using fallback reference");
        Ok(fallback)
    }
}
