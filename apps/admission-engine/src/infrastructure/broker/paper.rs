//! Paper broker implementing BrokerPort.
//!
//! Simulates an account in memory. Every accepted order fills immediately at
//! its limit or the current mark, and the broker then pushes what a real
//! broker would: the fill, a fresh position snapshot and a fresh account
//! summary. Buys larger than the remaining buying power are rejected with the
//! insufficient-margin code.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::application::ports::{BrokerError, BrokerPort, Contract, OrderSpec};
use crate::application::services::OrderFill;
use crate::domain::capital::{AccountTag, EvaluatedPosition};
use crate::domain::dispatch::OrderSide;
use crate::domain::shared::{BrokerOrderId, Money, Quantity, Symbol};
use crate::infrastructure::bridge::{BrokerEvent, BrokerEventSender};

/// Error code the paper broker uses for insufficient margin.
pub const INSUFFICIENT_MARGIN_CODE: i32 = 201;

/// Error code for an order with no price to fill at.
pub const NO_MARKET_DATA_CODE: i32 = 354;

/// Seed holding for the paper account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperPosition {
    /// Ticker.
    pub symbol: String,
    /// Shares held.
    pub quantity: Decimal,
    /// Average cost per share.
    pub average_price: Decimal,
    /// Current mark.
    pub market_price: Decimal,
}

/// Paper account seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    /// Starting buying power.
    pub buying_power: Decimal,
    /// Starting net liquidation value.
    pub net_liquidation: Decimal,
    /// Starting cash.
    pub cash: Decimal,
    /// Starting excess liquidity.
    pub excess_liquidity: Decimal,
    /// Starting holdings.
    pub positions: Vec<PaperPosition>,
    /// Marks for symbols not held.
    pub quotes: BTreeMap<String, Decimal>,
    /// Fill accepted orders immediately.
    pub fill_orders: bool,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            buying_power: dec!(100_000),
            net_liquidation: dec!(100_000),
            cash: dec!(50_000),
            excess_liquidity: dec!(30_000),
            positions: Vec::new(),
            quotes: BTreeMap::new(),
            fill_orders: true,
        }
    }
}

/// An order the paper broker received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperSubmission {
    /// Identifier it was sent under.
    pub order_id: BrokerOrderId,
    /// Contract.
    pub contract: Contract,
    /// Order details.
    pub spec: OrderSpec,
}

#[derive(Debug, Clone, Copy)]
struct Holding {
    quantity: Decimal,
    average_price: Decimal,
}

#[derive(Debug)]
struct PaperAccount {
    buying_power: Decimal,
    net_liquidation: Decimal,
    cash: Decimal,
    excess_liquidity: Decimal,
    holdings: BTreeMap<Symbol, Holding>,
    marks: HashMap<Symbol, Decimal>,
}

impl PaperAccount {
    fn from_config(config: &PaperConfig) -> Self {
        let mut holdings = BTreeMap::new();
        let mut marks: HashMap<Symbol, Decimal> = config
            .quotes
            .iter()
            .map(|(symbol, price)| (Symbol::new(symbol.as_str()), *price))
            .collect();
        for p in &config.positions {
            let symbol = Symbol::new(p.symbol.as_str());
            marks.insert(symbol.clone(), p.market_price);
            holdings.insert(
                symbol,
                Holding {
                    quantity: p.quantity,
                    average_price: p.average_price,
                },
            );
        }
        Self {
            buying_power: config.buying_power,
            net_liquidation: config.net_liquidation,
            cash: config.cash,
            excess_liquidity: config.excess_liquidity,
            holdings,
            marks,
        }
    }

    fn gross_position_value(&self) -> Decimal {
        self.holdings
            .iter()
            .map(|(symbol, h)| h.quantity * self.marks.get(symbol).copied().unwrap_or(h.average_price))
            .sum()
    }

    fn positions(&self) -> Vec<EvaluatedPosition> {
        self.holdings
            .iter()
            .filter_map(|(symbol, h)| {
                let mark = self.marks.get(symbol).copied().unwrap_or(h.average_price);
                let pnl = Money::new((mark - h.average_price) * h.quantity);
                match EvaluatedPosition::new(symbol.clone(), Quantity::new(h.quantity), h.average_price, pnl) {
                    Ok(position) => Some(position),
                    Err(e) => {
                        tracing::warn!(%symbol, error = %e, "Skipping unreportable paper holding");
                        None
                    }
                }
            })
            .collect()
    }

    fn apply_fill(&mut self, symbol: &Symbol, side: OrderSide, quantity: Decimal, price: Decimal) {
        let notional = quantity * price;
        match side {
            OrderSide::Buy => {
                self.cash -= notional;
                self.buying_power -= notional;
                let holding = self.holdings.entry(symbol.clone()).or_insert(Holding {
                    quantity: Decimal::ZERO,
                    average_price: price,
                });
                let total = holding.quantity + quantity;
                holding.average_price = (holding.average_price * holding.quantity + notional) / total;
                holding.quantity = total;
            }
            OrderSide::Sell => {
                self.cash += notional;
                self.buying_power += notional;
                if let Some(holding) = self.holdings.get_mut(symbol) {
                    holding.quantity -= quantity;
                    if holding.quantity <= Decimal::ZERO {
                        self.holdings.remove(symbol);
                    }
                }
            }
        }
        self.marks.insert(symbol.clone(), price);
    }
}

/// In-memory broker for paper runs and tests.
#[derive(Debug)]
pub struct PaperBroker {
    events: BrokerEventSender,
    fill_orders: bool,
    account: Mutex<PaperAccount>,
    submissions: Mutex<Vec<PaperSubmission>>,
    scripted_rejections: Mutex<VecDeque<(i32, String)>>,
    scripted_failures: Mutex<VecDeque<String>>,
}

impl PaperBroker {
    /// Create a paper broker that pushes its callbacks onto `events`.
    #[must_use]
    pub fn new(config: &PaperConfig, events: BrokerEventSender) -> Self {
        Self {
            events,
            fill_orders: config.fill_orders,
            account: Mutex::new(PaperAccount::from_config(config)),
            submissions: Mutex::new(Vec::new()),
            scripted_rejections: Mutex::new(VecDeque::new()),
            scripted_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Push the current account summary, positions and marks.
    pub fn publish_account(&self) {
        let account = self.account.lock();
        for (symbol, price) in &account.marks {
            self.emit(BrokerEvent::Quote {
                symbol: symbol.clone(),
                price: *price,
            });
        }
        self.emit_positions(&account);
        self.emit_summary(&account);
    }

    /// Move a mark and push it as a quote.
    pub fn set_mark(&self, symbol: Symbol, price: Decimal) {
        self.account.lock().marks.insert(symbol.clone(), price);
        self.emit(BrokerEvent::Quote { symbol, price });
    }

    /// Reject the next accepted order with `code`.
    pub fn reject_next(&self, code: i32, message: impl Into<String>) {
        self.scripted_rejections.lock().push_back((code, message.into()));
    }

    /// Fail the next submission call outright.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.scripted_failures.lock().push_back(message.into());
    }

    /// Orders received, in arrival order.
    pub fn submissions(&self) -> Vec<PaperSubmission> {
        self.submissions.lock().clone()
    }

    /// Current simulated buying power.
    pub fn buying_power(&self) -> Decimal {
        self.account.lock().buying_power
    }

    fn emit(&self, event: BrokerEvent) {
        if let Err(e) = self.events.try_send(event) {
            tracing::warn!(error = %e, "Paper broker event dropped");
        }
    }

    fn emit_positions(&self, account: &PaperAccount) {
        for position in account.positions() {
            self.emit(BrokerEvent::Position(position));
        }
        self.emit(BrokerEvent::PositionEnd);
    }

    fn emit_summary(&self, account: &PaperAccount) {
        let values = [
            (AccountTag::BuyingPower, account.buying_power),
            (AccountTag::NetLiquidation, account.net_liquidation),
            (AccountTag::TotalCashValue, account.cash),
            (AccountTag::ExcessLiquidity, account.excess_liquidity),
            (AccountTag::GrossPositionValue, account.gross_position_value()),
        ];
        for (tag, value) in values {
            self.emit(BrokerEvent::AccountValue {
                tag: tag.as_str().to_string(),
                value: value.to_string(),
            });
        }
        self.emit(BrokerEvent::AccountSummaryEnd);
    }

    fn reject(&self, order_id: BrokerOrderId, code: i32, message: String) {
        tracing::info!(%order_id, code, reason = %message, "Paper order rejected");
        self.emit(BrokerEvent::OrderRejected {
            broker_order_id: order_id,
            code,
            message,
        });
    }
}

#[async_trait]
impl BrokerPort for PaperBroker {
    async fn submit_order(
        &self,
        order_id: BrokerOrderId,
        contract: &Contract,
        spec: &OrderSpec,
    ) -> Result<(), BrokerError> {
        if let Some(message) = self.scripted_failures.lock().pop_front() {
            return Err(BrokerError::ConnectionError { message });
        }

        self.submissions.lock().push(PaperSubmission {
            order_id,
            contract: contract.clone(),
            spec: spec.clone(),
        });
        tracing::debug!(
            %order_id,
            symbol = %contract.symbol,
            action = %spec.action,
            quantity = spec.total_quantity,
            "Paper order received"
        );

        if let Some((code, message)) = self.scripted_rejections.lock().pop_front() {
            self.reject(order_id, code, message);
            return Ok(());
        }
        if !self.fill_orders {
            return Ok(());
        }

        let mut account = self.account.lock();
        let Some(price) = spec
            .kind
            .limit_price()
            .or_else(|| account.marks.get(&contract.symbol).copied())
        else {
            drop(account);
            self.reject(order_id, NO_MARKET_DATA_CODE, format!("No market data for {}", contract.symbol));
            return Ok(());
        };

        let quantity = Decimal::from(spec.total_quantity);
        if spec.action == OrderSide::Buy && quantity * price > account.buying_power {
            drop(account);
            self.reject(
                order_id,
                INSUFFICIENT_MARGIN_CODE,
                "Order rejected - reason: insufficient margin".to_string(),
            );
            return Ok(());
        }

        account.apply_fill(&contract.symbol, spec.action, quantity, price);
        self.emit(BrokerEvent::OrderFilled(OrderFill {
            broker_order_id: order_id,
            symbol: contract.symbol.clone(),
            side: spec.action,
            quantity: Quantity::new(quantity),
            price,
        }));
        self.emit_positions(&account);
        self.emit_summary(&account);
        Ok(())
    }
}
