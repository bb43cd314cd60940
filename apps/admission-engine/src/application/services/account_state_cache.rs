//! Account State Cache
//!
//! Single source of truth for capital metrics and evaluated holdings, fed by
//! broker pushes. Readers get an immutable snapshot; writers build the next
//! value and swap it in, so a reader never observes a half-applied update.
//!
//! Positions follow replace-all semantics: rows received during a position
//! sync are staged and only become visible on the end-of-sync marker.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::capital::{AccountTag, CapitalSnapshot, EvaluatedPosition};
use crate::domain::shared::{Money, Symbol};

#[derive(Debug, Clone, Default)]
struct CacheState {
    snapshot: CapitalSnapshot,
    gross_position_value: Money,
    positions: Arc<Vec<EvaluatedPosition>>,
    staging: Option<BTreeMap<Symbol, EvaluatedPosition>>,
    updated_at: Option<DateTime<Utc>>,
}

/// Latest capital metrics and positions.
#[derive(Debug, Default)]
pub struct AccountStateCache {
    state: RwLock<CacheState>,
}

impl AccountStateCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache seeded with a snapshot.
    #[must_use]
    pub fn with_snapshot(snapshot: CapitalSnapshot) -> Self {
        Self {
            state: RwLock::new(CacheState {
                snapshot,
                updated_at: Some(Utc::now()),
                ..CacheState::default()
            }),
        }
    }

    /// Latest capital snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CapitalSnapshot {
        self.state.read().snapshot
    }

    /// Latest evaluated positions, sorted by symbol.
    #[must_use]
    pub fn positions(&self) -> Arc<Vec<EvaluatedPosition>> {
        Arc::clone(&self.state.read().positions)
    }

    /// Market value of all positions as last reported.
    #[must_use]
    pub fn gross_position_value(&self) -> Money {
        self.state.read().gross_position_value
    }

    /// Time of the last applied update.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().updated_at
    }

    /// Merge one account-summary value.
    ///
    /// Unknown tags and unparsable values are logged and discarded. Returns
    /// true if a cached field changed.
    pub fn on_account_value(&self, tag: &str, value: &str) -> bool {
        let Some(tag) = AccountTag::parse(tag) else {
            tracing::debug!(tag, value, "Ignoring untracked account tag");
            return false;
        };
        let Ok(amount) = Decimal::from_str(value.trim()) else {
            tracing::warn!(%tag, value, "Discarding unparsable account value");
            return false;
        };
        let amount = Money::new(amount);

        let mut state = self.state.write();
        let current = state.snapshot;
        let (buying_power, nlv, cash, excess) = match tag {
            AccountTag::BuyingPower => (amount, current.net_liquidation_value, current.cash, current.excess_liquidity),
            AccountTag::NetLiquidation => (current.buying_power, amount, current.cash, current.excess_liquidity),
            AccountTag::TotalCashValue => (current.buying_power, current.net_liquidation_value, amount, current.excess_liquidity),
            AccountTag::ExcessLiquidity => (current.buying_power, current.net_liquidation_value, current.cash, amount),
            AccountTag::GrossPositionValue => {
                state.gross_position_value = amount.non_negative();
                state.updated_at = Some(Utc::now());
                return true;
            }
        };

        let reserve = if matches!(tag, AccountTag::NetLiquidation | AccountTag::ExcessLiquidity) {
            CapitalSnapshot::derive_reserve_fraction(excess, nlv)
        } else {
            current.reserve_margin_fraction
        };
        state.snapshot = CapitalSnapshot::new(buying_power, nlv, cash, excess, reserve);
        state.updated_at = Some(Utc::now());
        tracing::trace!(%tag, %amount, "Account value merged");
        true
    }

    /// Apply the metrics carried by a liquidity-replenished notification.
    ///
    /// Cash and excess liquidity keep their cached values.
    pub fn apply_liquidity_refresh(
        &self,
        buying_power: Money,
        net_liquidation_value: Money,
        reserve_margin_fraction: Decimal,
    ) -> CapitalSnapshot {
        let mut state = self.state.write();
        let current = state.snapshot;
        state.snapshot = CapitalSnapshot::new(
            buying_power,
            net_liquidation_value,
            current.cash,
            current.excess_liquidity,
            reserve_margin_fraction,
        );
        state.updated_at = Some(Utc::now());
        state.snapshot
    }

    /// Stage one row of a position sync.
    pub fn on_position(&self, position: EvaluatedPosition) {
        let mut state = self.state.write();
        state
            .staging
            .get_or_insert_with(BTreeMap::new)
            .insert(position.symbol().clone(), position);
    }

    /// Stage a batch of position rows.
    pub fn on_position_snapshot(&self, positions: Vec<EvaluatedPosition>) {
        let mut state = self.state.write();
        let staging = state.staging.get_or_insert_with(BTreeMap::new);
        for position in positions {
            staging.insert(position.symbol().clone(), position);
        }
    }

    /// End of a position sync: replace all cached positions with the staged rows.
    ///
    /// An end marker with nothing staged means the account is flat.
    pub fn on_position_snapshot_end(&self) -> usize {
        let mut state = self.state.write();
        let staged = state.staging.take().unwrap_or_default();
        let count = staged.len();
        state.positions = Arc::new(staged.into_values().collect());
        state.updated_at = Some(Utc::now());
        tracing::debug!(positions = count, "Position snapshot replaced");
        count
    }
}
