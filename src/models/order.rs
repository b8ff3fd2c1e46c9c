//! Orders: the unit of intent submitted to the CDA engine.
//!
//! Lifecycle is strictly `NEW -> WORKING -> DONE`; `end_reason` stays
//! `NONE` until `DONE`, at which point exactly one terminal reason is
//! set (invariant O1). Mutations that would violate lifecycle ordering
//! are programmer errors and panic rather than returning a `Result`,
//! per the crate's error-handling split (domain outcomes vs.
//! precondition violations).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderLifecycle {
    New,
    Working,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEndReason {
    None,
    Filled,
    Cancelled,
    Expired,
    RejectedInsufficientFund,
    RejectedInsufficientMarketDepth,
    KilledWashTrade,
}

/// A buy/sell intent for the single traded instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    order_id: u64,
    agent_id: u64,
    /// Logical submission timestamp. The engine has no wall-clock
    /// dependence for correctness; this is a monotonic stand-in
    /// assigned by the facade (see `Environment::create_order`), kept
    /// only for the persisted row shape spec.md names.
    timestamp: f64,
    /// `(macro, micro)` hybrid time at submission -- distinct from
    /// `trades`, which may be attached on a later tick for a resting
    /// LIMIT order.
    created_at: (usize, usize),

    order_type: OrderType,
    side: Side,

    quantity: i64,
    remaining_quantity: i64,
    price: Option<i64>,

    lifecycle: OrderLifecycle,
    end_reason: OrderEndReason,

    trades: BTreeMap<u64, Trade>,
}

impl Order {
    /// Construct a new order in lifecycle `New`.
    ///
    /// # Panics
    /// Panics if `quantity <= 0`, if a `Limit` order has no price or a
    /// non-positive price, or if a `Market` order carries a price.
    pub fn new(
        order_id: u64,
        agent_id: u64,
        timestamp: f64,
        created_at: (usize, usize),
        order_type: OrderType,
        side: Side,
        quantity: i64,
        price: Option<i64>,
    ) -> Self {
        assert!(quantity > 0, "quantity must be positive");
        match order_type {
            OrderType::Limit => {
                assert!(
                    price.is_some_and(|p| p > 0),
                    "limit orders require a positive price"
                );
            }
            OrderType::Market => {
                assert!(price.is_none(), "market orders must not carry a price");
            }
        }
        Self {
            order_id,
            agent_id,
            timestamp,
            created_at,
            order_type,
            side,
            quantity,
            remaining_quantity: quantity,
            price,
            lifecycle: OrderLifecycle::New,
            end_reason: OrderEndReason::None,
            trades: BTreeMap::new(),
        }
    }

    pub fn order_id(&self) -> u64 {
        self.order_id
    }

    pub fn agent_id(&self) -> u64 {
        self.agent_id
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn created_at(&self) -> (usize, usize) {
        self.created_at
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn remaining_quantity(&self) -> i64 {
        self.remaining_quantity
    }

    pub fn price(&self) -> Option<i64> {
        self.price
    }

    pub fn lifecycle(&self) -> OrderLifecycle {
        self.lifecycle
    }

    pub fn end_reason(&self) -> OrderEndReason {
        self.end_reason
    }

    pub fn trades(&self) -> &BTreeMap<u64, Trade> {
        &self.trades
    }

    /// True iff the order belongs resident in the book (invariant O2).
    pub fn is_resident_eligible(&self) -> bool {
        self.order_type == OrderType::Limit
            && self.lifecycle == OrderLifecycle::Working
            && self.remaining_quantity > 0
    }

    /// `NEW -> WORKING`. Called once, by `CdaEngine::process_new_order`.
    pub(crate) fn start_working(&mut self) {
        assert!(
            self.lifecycle == OrderLifecycle::New,
            "start_working called on a non-NEW order"
        );
        assert!(
            self.end_reason == OrderEndReason::None,
            "end_reason must be NONE before WORKING"
        );
        assert!(self.trades.is_empty(), "a NEW order must carry no trades");
        self.lifecycle = OrderLifecycle::Working;
    }

    /// `WORKING -> DONE` with exactly one terminal reason (invariant O1).
    pub(crate) fn finish(&mut self, end_reason: OrderEndReason) {
        assert!(end_reason != OrderEndReason::None, "finish requires a terminal reason");
        assert!(
            self.lifecycle == OrderLifecycle::Working,
            "finish called on a non-WORKING order"
        );
        self.lifecycle = OrderLifecycle::Done;
        self.end_reason = end_reason;
    }

    /// Decrement `remaining_quantity` by a fill; called during matching.
    pub(crate) fn reduce_remaining(&mut self, quantity: i64) {
        assert!(quantity > 0, "reduced quantity must be positive");
        assert!(
            quantity <= self.remaining_quantity,
            "cannot reduce below zero remaining quantity"
        );
        self.remaining_quantity -= quantity;
    }

    /// Record that `trade` filled (part of) this order.
    pub(crate) fn attach_trade(&mut self, trade: Trade) {
        self.trades.insert(trade.trade_id, trade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit(side: Side, qty: i64, price: i64) -> Order {
        Order::new(1, 1, 0.0, (0, 0), OrderType::Limit, side, qty, Some(price))
    }

    #[test]
    #[should_panic(expected = "quantity must be positive")]
    fn rejects_non_positive_quantity() {
        Order::new(1, 1, 0.0, (0, 0), OrderType::Limit, Side::Buy, 0, Some(100));
    }

    #[test]
    #[should_panic(expected = "limit orders require a positive price")]
    fn rejects_limit_without_price() {
        Order::new(1, 1, 0.0, (0, 0), OrderType::Limit, Side::Buy, 1, None);
    }

    #[test]
    #[should_panic(expected = "market orders must not carry a price")]
    fn rejects_market_with_price() {
        Order::new(1, 1, 0.0, (0, 0), OrderType::Market, Side::Buy, 1, Some(1));
    }

    #[test]
    fn lifecycle_transitions() {
        let mut o = limit(Side::Buy, 10, 100);
        assert_eq!(o.lifecycle(), OrderLifecycle::New);
        o.start_working();
        assert_eq!(o.lifecycle(), OrderLifecycle::Working);
        assert!(o.is_resident_eligible());
        o.reduce_remaining(10);
        assert!(!o.is_resident_eligible());
        o.finish(OrderEndReason::Filled);
        assert_eq!(o.lifecycle(), OrderLifecycle::Done);
        assert_eq!(o.end_reason(), OrderEndReason::Filled);
    }

    #[test]
    #[should_panic(expected = "finish requires a terminal reason")]
    fn finish_rejects_none_reason() {
        let mut o = limit(Side::Buy, 10, 100);
        o.start_working();
        o.finish(OrderEndReason::None);
    }
}
