//! In-flight capital reservations.
//!
//! A reservation exists from the moment an order is handed to the broker
//! until exactly one terminal event: the fill that completes it, a rejection,
//! a submission rollback, or reconciliation against the broker's open orders.
//! Partial fills shrink the reservation without ending it.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::dispatch::{OrderKind, OrderOrigin, OrderSide, QueuedOrder};
use crate::domain::shared::{
    BrokerOrderId, ClientOrderId, DomainError, Money, Quantity, Symbol, TransactionId,
};

/// Capital held against an order awaiting broker confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlightReservation {
    /// Process-local key.
    pub client_order_id: ClientOrderId,
    /// Broker-facing identifier the order was sent under.
    pub broker_order_id: BrokerOrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Market or limit, as sent.
    pub kind: OrderKind,
    /// Whole shares reserved.
    pub reserved_quantity: u64,
    /// Shares filled so far.
    #[serde(default)]
    pub filled_quantity: u64,
    /// Price used to value the reservation.
    pub reference_price: Decimal,
    /// Idempotency key of the order.
    pub transaction_id: TransactionId,
    /// Producer of the order.
    pub origin: OrderOrigin,
}

impl InFlightReservation {
    /// Shares still awaiting a fill.
    #[must_use]
    pub const fn remaining_quantity(&self) -> u64 {
        self.reserved_quantity.saturating_sub(self.filled_quantity)
    }

    /// `remaining_quantity x reference_price`.
    #[must_use]
    pub fn notional(&self) -> Money {
        Money::new(Decimal::from(self.remaining_quantity()) * self.reference_price)
    }

    /// The order this reservation was taken for, at `quantity` shares.
    #[must_use]
    pub fn resubmission(&self, quantity: u64) -> QueuedOrder {
        QueuedOrder {
            symbol: self.symbol.clone(),
            side: self.side,
            quantity: Quantity::from_u64(quantity),
            kind: self.kind,
            transaction_id: self.transaction_id.clone(),
            origin: self.origin,
        }
    }
}

/// Effect of a fill on its reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillProgress {
    /// Shares remain unfilled; the reservation stays open.
    Partial(InFlightReservation),
    /// The order is fully filled and its reservation released.
    Complete(InFlightReservation),
}

impl FillProgress {
    /// The reservation as of this fill.
    #[must_use]
    pub const fn reservation(&self) -> &InFlightReservation {
        match self {
            Self::Partial(r) | Self::Complete(r) => r,
        }
    }

    /// Returns true if the fill completed the order.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Reservations keyed by client order id, indexed by broker order id.
#[derive(Debug, Default)]
pub struct ReservationBook {
    by_client: HashMap<ClientOrderId, InFlightReservation>,
    by_broker: HashMap<BrokerOrderId, ClientOrderId>,
}

impl ReservationBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reservation.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if either identifier is already reserved.
    pub fn insert(&mut self, reservation: InFlightReservation) -> Result<(), DomainError> {
        if self.by_client.contains_key(&reservation.client_order_id)
            || self.by_broker.contains_key(&reservation.broker_order_id)
        {
            return Err(DomainError::InvariantViolation {
                entity: format!("reservation {}", reservation.client_order_id),
                invariant: "order identifiers must be unique".to_string(),
            });
        }
        self.by_broker
            .insert(reservation.broker_order_id, reservation.client_order_id.clone());
        self.by_client
            .insert(reservation.client_order_id.clone(), reservation);
        Ok(())
    }

    /// Remove a reservation by client order id.
    pub fn release(&mut self, client_order_id: &ClientOrderId) -> Option<InFlightReservation> {
        let reservation = self.by_client.remove(client_order_id)?;
        self.by_broker.remove(&reservation.broker_order_id);
        Some(reservation)
    }

    /// Remove a reservation by broker order id.
    pub fn release_by_broker(&mut self, broker_order_id: BrokerOrderId) -> Option<InFlightReservation> {
        let client_order_id = self.by_broker.remove(&broker_order_id)?;
        self.by_client.remove(&client_order_id)
    }

    /// Apply a fill of `quantity` shares.
    ///
    /// The reservation is released once cumulative fills reach the reserved
    /// quantity. Returns `None` for an unknown order.
    pub fn record_fill(&mut self, broker_order_id: BrokerOrderId, quantity: Quantity) -> Option<FillProgress> {
        let client_order_id = self.by_broker.get(&broker_order_id)?.clone();
        let reservation = self.by_client.get_mut(&client_order_id)?;

        let filled = quantity.amount().floor().max(Decimal::ZERO).to_u64().unwrap_or(u64::MAX);
        reservation.filled_quantity = reservation.filled_quantity.saturating_add(filled);

        if reservation.remaining_quantity() > 0 {
            return Some(FillProgress::Partial(reservation.clone()));
        }
        self.release(&client_order_id).map(FillProgress::Complete)
    }

    /// Look up a reservation by broker order id.
    #[must_use]
    pub fn get_by_broker(&self, broker_order_id: BrokerOrderId) -> Option<&InFlightReservation> {
        self.by_broker
            .get(&broker_order_id)
            .and_then(|id| self.by_client.get(id))
    }

    /// Release every reservation whose broker order is not in `open_orders`.
    pub fn reconcile(&mut self, open_orders: &HashSet<BrokerOrderId>) -> Vec<InFlightReservation> {
        let dangling: Vec<BrokerOrderId> = self
            .by_broker
            .keys()
            .filter(|id| !open_orders.contains(id))
            .copied()
            .collect();
        let mut released: Vec<InFlightReservation> = dangling
            .into_iter()
            .filter_map(|id| self.release_by_broker(id))
            .collect();
        released.sort_by_key(|r| r.broker_order_id);
        released
    }

    /// Notional held by in-flight buys.
    #[must_use]
    pub fn reserved_buy_notional(&self) -> Money {
        self.by_client
            .values()
            .filter(|r| r.side == OrderSide::Buy)
            .map(InFlightReservation::notional)
            .sum()
    }

    /// Number of open reservations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_client.len()
    }

    /// Returns true if nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }
}
