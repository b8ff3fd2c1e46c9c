//! Human-unit, read-only projections of the domain models.
//!
//! Views are the only place floats re-enter the crate: every integer
//! fixed-point field is divided by the configured scale `S` here, and
//! nowhere else. A view is an immutable snapshot with no back-reference
//! into mutable ledger/book state -- mutating the account after taking
//! a view never changes the view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::order::{OrderEndReason, OrderLifecycle, OrderType, Side};
use crate::models::{Account, Deposit, EconomyInsight, MarketData, Order};
use crate::money::from_fx;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub account_id: u64,
    pub agent_id: u64,
    pub cash: f64,
    pub shares: i64,
    /// order_id -> (quantity, human-unit limit price)
    pub reserved_cash: BTreeMap<u64, (i64, f64)>,
    /// order_id -> quantity
    pub reserved_shares: BTreeMap<u64, i64>,
    /// deposit_id -> human-unit principal
    pub deposited_cash: BTreeMap<u64, f64>,
}

pub fn account_view(account: &Account, price_scale: i64) -> AccountView {
    AccountView {
        account_id: account.account_id(),
        agent_id: account.agent_id(),
        cash: from_fx(account.cash(), price_scale),
        shares: account.shares(),
        reserved_cash: account
            .reserved_cash()
            .iter()
            .map(|(id, (qty, price))| (*id, (*qty, from_fx(*price, price_scale))))
            .collect(),
        reserved_shares: account.reserved_shares().clone(),
        deposited_cash: account
            .deposited_cash()
            .iter()
            .map(|(id, principal)| (*id, from_fx(*principal, price_scale)))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeView {
    pub trade_id: u64,
    pub macro_tick: usize,
    pub micro_tick: usize,
    pub buyer_agent_id: u64,
    pub buy_order_id: u64,
    pub seller_agent_id: u64,
    pub sell_order_id: u64,
    pub price: f64,
    pub quantity: i64,
    pub fee: f64,
}

pub fn trade_view(trade: &crate::models::Trade, price_scale: i64) -> TradeView {
    TradeView {
        trade_id: trade.trade_id,
        macro_tick: trade.macro_tick,
        micro_tick: trade.micro_tick,
        buyer_agent_id: trade.buyer_agent_id,
        buy_order_id: trade.buy_order_id,
        seller_agent_id: trade.seller_agent_id,
        sell_order_id: trade.sell_order_id,
        price: from_fx(trade.price, price_scale),
        quantity: trade.quantity,
        fee: from_fx(trade.fee, price_scale),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub order_id: u64,
    pub agent_id: u64,
    pub timestamp: f64,
    pub created_at: (usize, usize),
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub price: Option<f64>,
    pub lifecycle: OrderLifecycle,
    pub end_reason: OrderEndReason,
    pub trades: Vec<TradeView>,
}

pub fn order_view(order: &Order, price_scale: i64) -> OrderView {
    OrderView {
        order_id: order.order_id(),
        agent_id: order.agent_id(),
        timestamp: order.timestamp(),
        created_at: order.created_at(),
        order_type: order.order_type(),
        side: order.side(),
        quantity: order.quantity(),
        remaining_quantity: order.remaining_quantity(),
        price: order.price().map(|p| from_fx(p, price_scale)),
        lifecycle: order.lifecycle(),
        end_reason: order.end_reason(),
        trades: order.trades().values().map(|t| trade_view(t, price_scale)).collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepositView {
    pub deposit_id: u64,
    pub agent_id: u64,
    pub creation_tick: usize,
    pub maturity_tick: usize,
    pub principal: f64,
    pub interest_rate: f64,
    pub matured_cash: f64,
}

pub fn deposit_view(deposit: &Deposit, price_scale: i64) -> DepositView {
    DepositView {
        deposit_id: deposit.deposit_id,
        agent_id: deposit.agent_id,
        creation_tick: deposit.creation_tick,
        maturity_tick: deposit.maturity_tick,
        principal: from_fx(deposit.principal, price_scale),
        interest_rate: deposit.interest_rate,
        matured_cash: from_fx(deposit.matured_cash, price_scale),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyInsightView {
    pub macro_tick: usize,
    pub true_value: f64,
    pub short_rate: f64,
    pub width: f64,
    pub tv_interval: (f64, f64),
    pub deposit_rates: BTreeMap<usize, f64>,
}

pub fn economy_insight_view(insight: &EconomyInsight, price_scale: i64) -> EconomyInsightView {
    EconomyInsightView {
        macro_tick: insight.macro_tick,
        true_value: from_fx(insight.true_value, price_scale),
        short_rate: insight.short_rate,
        width: insight.width,
        tv_interval: (
            from_fx(insight.tv_interval.0, price_scale),
            from_fx(insight.tv_interval.1, price_scale),
        ),
        deposit_rates: insight.deposit_rates.clone(),
    }
}

/// `(human-price, size, order_count)`.
pub type BookLevelView = (f64, i64, usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataView {
    pub timestamp: f64,
    pub macro_tick: usize,
    pub micro_tick: usize,

    pub trade_count: u64,
    pub trade_volume: i64,

    pub last_traded_price: Option<f64>,
    pub last_trade_size: Option<i64>,

    pub l1_bids: Option<BookLevelView>,
    pub l1_asks: Option<BookLevelView>,

    pub spread: Option<f64>,
    pub mid_price: Option<f64>,
    pub micro_price: Option<f64>,

    pub l2_bids: Option<Vec<BookLevelView>>,
    pub l2_asks: Option<Vec<BookLevelView>>,

    pub n: usize,
    pub bids_depth_n: i64,
    pub asks_depth_n: i64,
    pub imbalance_n: Option<f64>,

    pub vwap_macro: Option<f64>,
    pub vwap_micro: Option<f64>,
}

fn level_view(level: Option<(i64, i64, usize)>, price_scale: i64) -> Option<BookLevelView> {
    level.map(|(price, size, orders)| (from_fx(price, price_scale), size, orders))
}

pub fn market_data_view(data: &MarketData, price_scale: i64) -> MarketDataView {
    MarketDataView {
        timestamp: data.timestamp,
        macro_tick: data.macro_tick,
        micro_tick: data.micro_tick,
        trade_count: data.trade_count,
        trade_volume: data.trade_volume,
        last_traded_price: data.last_traded_price.map(|p| from_fx(p, price_scale)),
        last_trade_size: data.last_trade_size,
        l1_bids: level_view(data.l1_bids, price_scale),
        l1_asks: level_view(data.l1_asks, price_scale),
        spread: data.spread.map(|s| from_fx(s, price_scale)),
        mid_price: data.mid_price.map(|m| from_fx(m, price_scale)),
        micro_price: data.micro_price.map(|m| from_fx(m, price_scale)),
        l2_bids: data
            .l2_bids
            .as_ref()
            .map(|levels| levels.iter().map(|l| level_view(Some(*l), price_scale).unwrap()).collect()),
        l2_asks: data
            .l2_asks
            .as_ref()
            .map(|levels| levels.iter().map(|l| level_view(Some(*l), price_scale).unwrap()).collect()),
        n: data.n,
        bids_depth_n: data.bids_depth_n,
        asks_depth_n: data.asks_depth_n,
        imbalance_n: data.imbalance_n,
        vwap_macro: data.vwap_macro.map(|v| from_fx(v, price_scale)),
        vwap_micro: data.vwap_micro.map(|v| from_fx(v, price_scale)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_view_scales_money_fields() {
        let mut acct = Account::new(0, 1, 10_000, 0);
        acct.reserve_cash_for_order(5, 10, 101_00);
        let view = account_view(&acct, 100);
        assert_eq!(view.cash, 100.0);
        assert_eq!(view.reserved_cash.get(&5), Some(&(10, 101.0)));
    }

    #[test]
    fn deposit_view_scales_principal_and_matured_cash() {
        let deposit = Deposit::new(0, 1, 0, 3, 500_00, 0.03);
        let view = deposit_view(&deposit, 100);
        assert_eq!(view.principal, 500.0);
        assert_eq!(view.matured_cash, 515.0);
    }
}
