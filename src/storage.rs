//! The narrow, append-only storage sink: six per-entity tables, flushed
//! once per macro tick.
//!
//! This module is deliberately not a real persistence backend -- the
//! outer driver supplies one (a file, a database, a network sink) by
//! implementing [`StorageSink`]. [`InMemoryStorageSink`] is the
//! reference implementation used by this crate's own tests and by any
//! caller that doesn't need durability across process restarts.
//!
//! Row shapes mirror the six tables of the persisted state layout:
//! `orders`, `trades`, `accounts`, `deposits`, `economy_insights`,
//! `market_data`. `accounts` is a genuine panel time series keyed by
//! `(macro_tick, account_id)` and is never cleared by `flush`; the other
//! five tables are append-once-then-drained buffers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::order::{OrderEndReason, OrderLifecycle, OrderType, Side};
use crate::models::{Account, Deposit, EconomyInsight, MarketData, Order, Trade};

/// Fatal I/O failure from a real-backend implementor. The in-memory
/// reference sink never produces one -- only an implementor with an
/// actual external resource (file, socket, database) can fail here,
/// per spec.md §5/§7: storage is the only component permitted to fail
/// on external resources, and that failure is always propagated, never
/// swallowed into a domain outcome.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage sink I/O failure: {0}")]
    Io(String),
    #[error("storage sink already closed")]
    Closed,
}

/// One row of the `accounts` panel: `account.cash`/`shares` plus the
/// three reservation/deposit aggregates the table names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub macro_tick: usize,
    pub account_id: u64,
    pub agent_id: u64,
    pub cash: i64,
    pub shares: i64,
    pub reserved_cash_total: i64,
    pub reserved_shares_total: i64,
    pub deposited_cash_total: i64,
}

impl AccountRow {
    pub fn from_account(account: &Account, macro_tick: usize) -> Self {
        Self {
            macro_tick,
            account_id: account.account_id(),
            agent_id: account.agent_id(),
            cash: account.cash(),
            shares: account.shares(),
            reserved_cash_total: account.total_reserved_cash(),
            reserved_shares_total: account.total_reserved_shares(),
            deposited_cash_total: account.total_deposited_cash(),
        }
    }
}

/// One row of the `orders` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_id: u64,
    pub agent_id: u64,
    pub timestamp: f64,
    pub macro_tick: usize,
    pub micro_tick: usize,
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: i64,
    pub price: Option<i64>,
    pub lifecycle: OrderLifecycle,
    pub end_reason: OrderEndReason,
    pub remaining_quantity: i64,
}

impl OrderRow {
    pub fn from_order(order: &Order) -> Self {
        let (macro_tick, micro_tick) = order.created_at();
        Self {
            order_id: order.order_id(),
            agent_id: order.agent_id(),
            timestamp: order.timestamp(),
            macro_tick,
            micro_tick,
            order_type: order.order_type(),
            side: order.side(),
            quantity: order.quantity(),
            price: order.price(),
            lifecycle: order.lifecycle(),
            end_reason: order.end_reason(),
            remaining_quantity: order.remaining_quantity(),
        }
    }
}

/// The narrow append-only persistence contract. Implementors own their
/// own connection state; the engine/ledger never hold a reference to
/// whatever resource backs this (file handle, socket, DB pool).
pub trait StorageSink {
    /// Upsert an account snapshot row. Never rejected: the `accounts`
    /// panel is keyed by `(macro_tick, account_id)`, so a later call
    /// for the same tick overwrites, and a new tick always adds a row.
    fn add_account(&mut self, row: AccountRow);

    /// Append an order row, upserted by `order_id` so a later lifecycle
    /// transition (WORKING -> DONE) on the same order is visible without
    /// a second table scan. Returns `false` if `closed()`.
    fn add_order(&mut self, row: OrderRow) -> bool;

    /// Append-once by `trade_id`. Returns `false` on a duplicate id or
    /// if closed.
    fn add_trade(&mut self, trade: Trade) -> bool;

    /// Append-once by `deposit_id`. Returns `false` on a duplicate id or
    /// if closed.
    fn add_deposit(&mut self, deposit: Deposit) -> bool;

    /// Append-once by `macro_tick`. Returns `false` on a duplicate tick
    /// or if closed.
    fn add_insight(&mut self, insight: EconomyInsight) -> bool;

    /// Append-once by `(macro_tick, micro_tick)`. Returns `false` on a
    /// duplicate key or if closed.
    fn add_market_data(&mut self, data: MarketData) -> bool;

    /// Emit all buffered order/trade/deposit/insight/market-data rows
    /// and clear those five buffers (the `accounts` panel is untouched).
    /// Idempotent within a tick: returns `false` if this tick was
    /// already flushed.
    ///
    /// # Errors
    /// Real backends may fail here on the external resource; that
    /// failure is fatal and must be propagated, not swallowed.
    fn flush(&mut self, current_macro: usize) -> Result<bool, StorageError>;

    fn get_order(&self, order_id: u64) -> Option<&OrderRow>;
    fn get_trade(&self, trade_id: u64) -> Option<&Trade>;
    fn get_deposit(&self, deposit_id: u64) -> Option<&Deposit>;
    fn get_insight(&self, macro_tick: usize) -> Option<&EconomyInsight>;
    fn get_market_data(&self, hybrid_time: (usize, usize)) -> Option<&MarketData>;

    /// Release the sink's resource. No further writes are valid after
    /// this returns `Ok`.
    fn close(&mut self) -> Result<(), StorageError>;
}

/// The reference in-memory [`StorageSink`]: never fails, buffers
/// everything, and is what this crate's own integration tests use.
#[derive(Debug, Default)]
pub struct InMemoryStorageSink {
    accounts: Vec<AccountRow>,

    orders: BTreeMap<u64, OrderRow>,
    trades: BTreeMap<u64, Trade>,
    deposits: BTreeMap<u64, Deposit>,
    insights: BTreeMap<usize, EconomyInsight>,
    market_data: BTreeMap<(usize, usize), MarketData>,

    last_flush_macro_tick: Option<usize>,
    flushed_orders: Vec<OrderRow>,
    flushed_trades: Vec<Trade>,
    flushed_deposits: Vec<Deposit>,
    flushed_insights: Vec<EconomyInsight>,
    flushed_market_data: Vec<MarketData>,

    closed: bool,
}

impl InMemoryStorageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every account row ever upserted, across every tick -- the panel
    /// is never cleared by `flush`.
    pub fn account_rows(&self) -> &[AccountRow] {
        &self.accounts
    }

    /// Rows emitted by the most recent successful `flush`.
    pub fn flushed_orders(&self) -> &[OrderRow] {
        &self.flushed_orders
    }

    pub fn flushed_trades(&self) -> &[Trade] {
        &self.flushed_trades
    }

    pub fn flushed_deposits(&self) -> &[Deposit] {
        &self.flushed_deposits
    }

    pub fn flushed_insights(&self) -> &[EconomyInsight] {
        &self.flushed_insights
    }

    pub fn flushed_market_data(&self) -> &[MarketData] {
        &self.flushed_market_data
    }
}

impl StorageSink for InMemoryStorageSink {
    fn add_account(&mut self, row: AccountRow) {
        self.accounts.push(row);
    }

    fn add_order(&mut self, row: OrderRow) -> bool {
        if self.closed {
            return false;
        }
        self.orders.insert(row.order_id, row);
        true
    }

    fn add_trade(&mut self, trade: Trade) -> bool {
        if self.closed || self.trades.contains_key(&trade.trade_id) {
            return false;
        }
        self.trades.insert(trade.trade_id, trade);
        true
    }

    fn add_deposit(&mut self, deposit: Deposit) -> bool {
        if self.closed || self.deposits.contains_key(&deposit.deposit_id) {
            return false;
        }
        self.deposits.insert(deposit.deposit_id, deposit);
        true
    }

    fn add_insight(&mut self, insight: EconomyInsight) -> bool {
        if self.closed || self.insights.contains_key(&insight.macro_tick) {
            return false;
        }
        self.insights.insert(insight.macro_tick, insight);
        true
    }

    fn add_market_data(&mut self, data: MarketData) -> bool {
        let key = (data.macro_tick, data.micro_tick);
        if self.closed || self.market_data.contains_key(&key) {
            return false;
        }
        self.market_data.insert(key, data);
        true
    }

    fn flush(&mut self, current_macro: usize) -> Result<bool, StorageError> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        if self.last_flush_macro_tick == Some(current_macro) {
            return Ok(false);
        }

        self.flushed_orders = self.orders.values().cloned().collect();
        self.flushed_trades = self.trades.values().copied().collect();
        self.flushed_deposits = self.deposits.values().copied().collect();
        self.flushed_insights = self.insights.values().cloned().collect();
        self.flushed_market_data = self.market_data.values().cloned().collect();

        self.orders.clear();
        self.trades.clear();
        self.deposits.clear();
        self.insights.clear();
        self.market_data.clear();

        self.last_flush_macro_tick = Some(current_macro);
        Ok(true)
    }

    fn get_order(&self, order_id: u64) -> Option<&OrderRow> {
        self.orders.get(&order_id)
    }

    fn get_trade(&self, trade_id: u64) -> Option<&Trade> {
        self.trades.get(&trade_id)
    }

    fn get_deposit(&self, deposit_id: u64) -> Option<&Deposit> {
        self.deposits.get(&deposit_id)
    }

    fn get_insight(&self, macro_tick: usize) -> Option<&EconomyInsight> {
        self.insights.get(&macro_tick)
    }

    fn get_market_data(&self, hybrid_time: (usize, usize)) -> Option<&MarketData> {
        self.market_data.get(&hybrid_time)
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{OrderType, Side};
    use crate::models::Order;

    fn sample_order() -> Order {
        Order::new(1, 1, 0.0, (0, 0), OrderType::Limit, Side::Buy, 10, Some(100))
    }

    #[test]
    fn flush_is_idempotent_within_a_tick() {
        let mut sink = InMemoryStorageSink::new();
        assert!(sink.add_order(OrderRow::from_order(&sample_order())));
        assert_eq!(sink.flush(0).unwrap(), true);
        assert_eq!(sink.flush(0).unwrap(), false, "second flush in the same tick is a no-op");
    }

    #[test]
    fn flush_clears_five_tables_but_not_accounts() {
        let mut sink = InMemoryStorageSink::new();
        sink.add_account(AccountRow {
            macro_tick: 0,
            account_id: 0,
            agent_id: 1,
            cash: 100,
            shares: 0,
            reserved_cash_total: 0,
            reserved_shares_total: 0,
            deposited_cash_total: 0,
        });
        sink.add_order(OrderRow::from_order(&sample_order()));
        sink.flush(0).unwrap();

        assert!(sink.get_order(1).is_none(), "orders buffer clears on flush");
        assert_eq!(sink.account_rows().len(), 1, "accounts panel survives flush");
    }

    #[test]
    fn duplicate_trade_id_rejected() {
        let mut sink = InMemoryStorageSink::new();
        let trade = Trade::new(0, 0, 0, 1, 1, 2, 2, 100, 1, 0);
        assert!(sink.add_trade(trade));
        assert!(!sink.add_trade(trade));
    }

    #[test]
    fn closed_sink_rejects_writes() {
        let mut sink = InMemoryStorageSink::new();
        sink.close().unwrap();
        assert!(!sink.add_order(OrderRow::from_order(&sample_order())));
        assert!(matches!(sink.flush(0), Err(StorageError::Closed)));
    }
}
