//! The continuous double auction matching core: accepts new orders,
//! matches them against the resident book, emits and settles trades,
//! and builds market data snapshots.
//!
//! Matching never returns a `Result`: every termination the taker can
//! reach (rejection, wash-kill, fill, resting) is carried on the
//! returned [`Order`]'s `end_reason`/`lifecycle`, per the crate's
//! error-handling split. Only a broken invariant (a maker vanishing
//! mid-loop, a settlement precondition failing) panics.

use crate::models::order::{OrderEndReason, OrderType, Side};
use crate::models::market_data::{BookLevel, MarketData};
use crate::models::{Order, Trade};
use crate::money::fee_ppm;
use crate::book::{depth_within, OrderBook};
use crate::settlement::SettlementLedger;

/// Result of `process_new_order`: the taker's final state, every trade
/// it produced, and any maker orders that were fully filled and left
/// the book as a side effect -- all three need recording by the caller.
#[derive(Debug)]
pub struct MatchOutcome {
    pub order: Order,
    pub trades: Vec<Trade>,
    pub filled_makers: Vec<Order>,
}

pub struct CdaEngine {
    book: OrderBook,
    fee_rate_ppm: i64,
    next_trade_id: u64,

    trade_count_micro: u64,
    trade_volume_micro: i64,
    value_micro: i64,
    last_traded_price: Option<i64>,
    last_trade_size: Option<i64>,

    trade_volume_macro: i64,
    value_macro: i64,
}

impl CdaEngine {
    pub fn new(fee_rate_ppm: i64) -> Self {
        Self {
            book: OrderBook::new(),
            fee_rate_ppm,
            next_trade_id: 0,
            trade_count_micro: 0,
            trade_volume_micro: 0,
            value_micro: 0,
            last_traded_price: None,
            last_trade_size: None,
            trade_volume_macro: 0,
            value_macro: 0,
        }
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Accept a fresh order. Pre: `lifecycle = NEW`, `end_reason = NONE`,
    /// `remaining_quantity = quantity`, no trades attached -- enforced by
    /// assertion, since a violation here is a facade bug, not a domain
    /// outcome.
    ///
    /// # Panics
    /// Panics if `order` does not meet the preconditions above.
    pub fn process_new_order(
        &mut self,
        mut order: Order,
        ledger: &mut SettlementLedger,
        macro_tick: usize,
        micro_tick: usize,
    ) -> MatchOutcome {
        assert_eq!(order.remaining_quantity(), order.quantity());
        assert_eq!(order.end_reason(), OrderEndReason::None);
        assert!(order.trades().is_empty());
        order.start_working();

        match order.order_type() {
            OrderType::Limit => self.process_limit(order, ledger, macro_tick, micro_tick),
            OrderType::Market => self.process_market(order, ledger, macro_tick, micro_tick),
        }
    }

    fn process_limit(
        &mut self,
        mut order: Order,
        ledger: &mut SettlementLedger,
        macro_tick: usize,
        micro_tick: usize,
    ) -> MatchOutcome {
        if !ledger.limit_check_and_reserve_funds(&order) {
            order.finish(OrderEndReason::RejectedInsufficientFund);
            return MatchOutcome { order, trades: Vec::new(), filled_makers: Vec::new() };
        }

        let mut trades = Vec::new();
        let mut filled_makers = Vec::new();
        let mut wash = false;
        let mut rest = false;

        while order.remaining_quantity() > 0 {
            let Some(maker_id) = self.contra_top(order.side()) else {
                rest = true;
                break;
            };
            let maker = self.book.get(maker_id).expect("maker resident");
            let maker_price = maker.price().expect("resting order has a price");
            let taker_price = order.price().expect("limit order has a price");

            let crosses = match order.side() {
                Side::Buy => taker_price >= maker_price,
                Side::Sell => taker_price <= maker_price,
            };
            if !crosses {
                rest = true;
                break;
            }
            if maker.agent_id() == order.agent_id() {
                wash = true;
                break;
            }

            let trade_qty = order.remaining_quantity().min(maker.remaining_quantity());
            let trade = self.build_trade(&order, maker_id, maker_price, trade_qty, macro_tick, micro_tick);
            self.settle_and_record(&mut order, maker_id, ledger, &trade, &mut trades, &mut filled_makers);
        }

        if wash {
            self.release_reservation(&order, ledger);
            order.finish(OrderEndReason::KilledWashTrade);
        } else if rest {
            self.book.add(order.clone());
        } else {
            order.finish(OrderEndReason::Filled);
        }

        MatchOutcome { order, trades, filled_makers }
    }

    fn process_market(
        &mut self,
        mut order: Order,
        ledger: &mut SettlementLedger,
        macro_tick: usize,
        micro_tick: usize,
    ) -> MatchOutcome {
        let mut trades = Vec::new();
        let mut filled_makers = Vec::new();
        let mut break_reason = None;

        while order.remaining_quantity() > 0 {
            let Some(maker_id) = self.contra_top(order.side()) else {
                break_reason = Some(OrderEndReason::RejectedInsufficientMarketDepth);
                break;
            };
            let maker = self.book.get(maker_id).expect("maker resident");
            let maker_price = maker.price().expect("resting order has a price");

            if maker.agent_id() == order.agent_id() {
                break_reason = Some(OrderEndReason::KilledWashTrade);
                break;
            }

            let possible_qty = ledger.market_possible_quantity(&order, Some(maker_price));
            if possible_qty == 0 {
                break_reason = Some(OrderEndReason::RejectedInsufficientFund);
                break;
            }

            let trade_qty = possible_qty.min(maker.remaining_quantity());
            let trade = self.build_trade(&order, maker_id, maker_price, trade_qty, macro_tick, micro_tick);
            self.settle_and_record(&mut order, maker_id, ledger, &trade, &mut trades, &mut filled_makers);
        }

        // MARKET orders never reserve funds up front, so a wash break
        // has nothing to release (spec-adopted simplification).
        order.finish(break_reason.unwrap_or(OrderEndReason::Filled));
        MatchOutcome { order, trades, filled_makers }
    }

    fn contra_top(&self, side: Side) -> Option<u64> {
        match side {
            Side::Buy => self.book.best_ask_order().map(|o| o.order_id()),
            Side::Sell => self.book.best_bid_order().map(|o| o.order_id()),
        }
    }

    fn release_reservation(&self, order: &Order, ledger: &mut SettlementLedger) {
        if order.order_type() != OrderType::Limit {
            return;
        }
        match order.side() {
            Side::Buy => ledger.release_cash(order, None),
            Side::Sell => ledger.release_shares(order, None),
        }
    }

    fn build_trade(
        &self,
        taker: &Order,
        maker_id: u64,
        maker_price: i64,
        trade_qty: i64,
        macro_tick: usize,
        micro_tick: usize,
    ) -> Trade {
        let maker_agent_id = self.book.get(maker_id).expect("maker resident").agent_id();
        let fee = fee_ppm(maker_price, trade_qty, self.fee_rate_ppm);
        let (buyer_agent_id, buy_order_id, seller_agent_id, sell_order_id) = match taker.side() {
            Side::Buy => (taker.agent_id(), taker.order_id(), maker_agent_id, maker_id),
            Side::Sell => (maker_agent_id, maker_id, taker.agent_id(), taker.order_id()),
        };
        Trade::new(
            self.next_trade_id,
            macro_tick,
            micro_tick,
            buyer_agent_id,
            buy_order_id,
            seller_agent_id,
            sell_order_id,
            maker_price,
            trade_qty,
            fee,
        )
    }

    /// Settle `trade`, retire the maker if it is now fully filled, and
    /// fold the fill into the micro/macro VWAP accumulators.
    fn settle_and_record(
        &mut self,
        order: &mut Order,
        maker_id: u64,
        ledger: &mut SettlementLedger,
        trade: &Trade,
        trades: &mut Vec<Trade>,
        filled_makers: &mut Vec<Order>,
    ) {
        self.next_trade_id += 1;
        {
            let maker_mut = self.book.get_mut(maker_id).expect("maker resident");
            match order.side() {
                Side::Buy => ledger.settle_trade(order, maker_mut, trade),
                Side::Sell => ledger.settle_trade(maker_mut, order, trade),
            }
        }

        self.trade_count_micro += 1;
        self.trade_volume_micro += trade.quantity;
        self.value_micro += trade.price * trade.quantity;
        self.trade_volume_macro += trade.quantity;
        self.value_macro += trade.price * trade.quantity;
        self.last_traded_price = Some(trade.price);
        self.last_trade_size = Some(trade.quantity);
        trades.push(*trade);

        if self.book.get(maker_id).expect("maker resident").remaining_quantity() == 0 {
            let mut removed = self.book.remove(maker_id).expect("just matched");
            removed.finish(OrderEndReason::Filled);
            filled_makers.push(removed);
        }
    }

    /// Cancel a working order. Silent no-op (returns `None`) if the
    /// order is unknown or owned by a different agent -- a domain
    /// outcome, not a precondition violation.
    pub fn cancel_order(&mut self, order_id: u64, agent_id: u64, ledger: &mut SettlementLedger) -> Option<Order> {
        if self.book.get(order_id)?.agent_id() != agent_id {
            return None;
        }
        let mut order = self.book.remove(order_id).expect("checked present above");
        self.release_reservation(&order, ledger);
        order.finish(OrderEndReason::Cancelled);
        Some(order)
    }

    /// Drain the book: release every reservation, mark every resident
    /// order `DONE/EXPIRED`, and reset the macro-tick VWAP accumulators.
    /// Returns the terminated orders for the caller to persist.
    pub fn expire_session(&mut self, ledger: &mut SettlementLedger) -> Vec<Order> {
        let Some((bids, asks)) = self.book.expire() else {
            return Vec::new();
        };

        let mut terminated = Vec::with_capacity(bids.len() + asks.len());
        for mut order in bids {
            ledger.release_cash(&order, None);
            order.finish(OrderEndReason::Expired);
            terminated.push(order);
        }
        for mut order in asks {
            ledger.release_shares(&order, None);
            order.finish(OrderEndReason::Expired);
            terminated.push(order);
        }

        self.trade_volume_macro = 0;
        self.value_macro = 0;
        terminated
    }

    /// Build the current market data snapshot. Micro-tick accumulators
    /// (trade count/volume, last trade, `vwap_micro`) are reset after
    /// every call; macro-tick accumulators survive until
    /// `expire_session`.
    pub fn get_market_data(&mut self, macro_tick: usize, micro_tick: usize, timestamp: f64, l2_depth: usize) -> MarketData {
        let l1_bids = self.book.l1_bids();
        let l1_asks = self.book.l1_asks();
        let l2_bids = self.book.l2_bids();
        let l2_asks = self.book.l2_asks();

        let (spread, mid_price, micro_price) = Self::top_of_book_stats(l1_bids, l1_asks);

        let bids_depth_n = depth_within(l2_bids.as_deref(), l2_depth);
        let asks_depth_n = depth_within(l2_asks.as_deref(), l2_depth);
        let imbalance_n = if bids_depth_n == 0 && asks_depth_n == 0 {
            None
        } else {
            Some((bids_depth_n - asks_depth_n) as f64 / (bids_depth_n + asks_depth_n) as f64)
        };

        let vwap_micro = (self.trade_volume_micro > 0).then(|| self.value_micro / self.trade_volume_micro);
        let vwap_macro = (self.trade_volume_macro > 0).then(|| self.value_macro / self.trade_volume_macro);

        let data = MarketData {
            timestamp,
            macro_tick,
            micro_tick,
            trade_count: self.trade_count_micro,
            trade_volume: self.trade_volume_micro,
            last_traded_price: self.last_traded_price,
            last_trade_size: self.last_trade_size,
            l1_bids,
            l1_asks,
            spread,
            mid_price,
            micro_price,
            l2_bids,
            l2_asks,
            n: l2_depth,
            bids_depth_n,
            asks_depth_n,
            imbalance_n,
            vwap_macro,
            vwap_micro,
        };

        self.trade_count_micro = 0;
        self.trade_volume_micro = 0;
        self.value_micro = 0;
        self.last_traded_price = None;
        self.last_trade_size = None;

        data
    }

    fn top_of_book_stats(
        l1_bids: Option<BookLevel>,
        l1_asks: Option<BookLevel>,
    ) -> (Option<i64>, Option<i64>, Option<i64>) {
        match (l1_bids, l1_asks) {
            (Some((bid_price, bid_size, _)), Some((ask_price, ask_size, _))) => {
                let spread = ask_price - bid_price;
                let mid = (ask_price + bid_price) / 2;
                let micro = (ask_price * bid_size + bid_price * ask_size) / (bid_size + ask_size);
                (Some(spread), Some(mid), Some(micro))
            }
            _ => (None, None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderType;
    use crate::models::Order;

    fn ledger_with(agents: &[(u64, f64, i64)], fee_rate_ppm: i64) -> SettlementLedger {
        let mut ledger = SettlementLedger::new(fee_rate_ppm, 100);
        for (agent_id, cash, shares) in agents {
            ledger.register_account(*agent_id, *cash, *shares);
        }
        ledger
    }

    fn new_order(id: u64, agent: u64, order_type: OrderType, side: Side, qty: i64, price: Option<i64>) -> Order {
        Order::new(id, agent, 0.0, (0, 0), order_type, side, qty, price)
    }

    #[test]
    fn clean_cross_settles_at_maker_price() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 0.0, 40), (2, 10_000.0, 0)], 0);

        let sell = new_order(1, 1, OrderType::Limit, Side::Sell, 10, Some(100_00));
        let outcome = engine.process_new_order(sell, &mut ledger, 0, 0);
        assert_eq!(outcome.order.end_reason(), OrderEndReason::None);

        let buy = new_order(2, 2, OrderType::Limit, Side::Buy, 10, Some(101_00));
        let outcome = engine.process_new_order(buy, &mut ledger, 0, 1);

        assert_eq!(outcome.order.end_reason(), OrderEndReason::Filled);
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price, 100_00, "trade prints at the maker's price");
        assert_eq!(outcome.filled_makers.len(), 1);
        assert_eq!(outcome.filled_makers[0].order_id(), 1);
    }

    #[test]
    fn partial_fill_leaves_taker_resting() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 0.0, 5), (2, 10_000.0, 0)], 0);

        engine.process_new_order(new_order(1, 1, OrderType::Limit, Side::Sell, 5, Some(100_00)), &mut ledger, 0, 0);
        let outcome = engine.process_new_order(
            new_order(2, 2, OrderType::Limit, Side::Buy, 10, Some(100_00)),
            &mut ledger,
            0,
            1,
        );

        assert_eq!(outcome.order.lifecycle(), crate::models::order::OrderLifecycle::Working);
        assert_eq!(outcome.order.remaining_quantity(), 5);
        assert!(engine.book().contains(2));
    }

    #[test]
    fn self_match_kills_taker_and_keeps_maker_resident() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 10_000.0, 10)], 0);

        engine.process_new_order(new_order(1, 1, OrderType::Limit, Side::Sell, 10, Some(100_00)), &mut ledger, 0, 0);
        let before = ledger.account(1).unwrap().cash();

        let outcome = engine.process_new_order(
            new_order(2, 1, OrderType::Limit, Side::Buy, 10, Some(100_00)),
            &mut ledger,
            0,
            1,
        );

        assert_eq!(outcome.order.end_reason(), OrderEndReason::KilledWashTrade);
        assert!(outcome.trades.is_empty());
        assert!(engine.book().contains(1), "maker stays resident through a wash break");
        assert_eq!(ledger.account(1).unwrap().cash(), before, "blanket release restores the taker's reservation");
    }

    #[test]
    fn non_crossing_self_order_rests_without_wash() {
        // Price check precedes the wash check: a non-crossing order
        // from the same agent as the resting order simply rests.
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 10_000.0, 10)], 0);

        engine.process_new_order(new_order(1, 1, OrderType::Limit, Side::Sell, 10, Some(100_00)), &mut ledger, 0, 0);
        let outcome = engine.process_new_order(
            new_order(2, 1, OrderType::Limit, Side::Buy, 5, Some(99_00)),
            &mut ledger,
            0,
            1,
        );

        assert_eq!(outcome.order.lifecycle(), crate::models::order::OrderLifecycle::Working);
        assert_eq!(outcome.order.end_reason(), OrderEndReason::None);
        assert!(engine.book().contains(2));
    }

    #[test]
    fn market_buy_against_empty_book_is_rejected_without_touching_cash() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 1_000.0, 0)], 0);
        let before = ledger.account(1).unwrap().cash();

        let outcome =
            engine.process_new_order(new_order(1, 1, OrderType::Market, Side::Buy, 5, None), &mut ledger, 0, 0);

        assert_eq!(outcome.order.end_reason(), OrderEndReason::RejectedInsufficientMarketDepth);
        assert_eq!(ledger.account(1).unwrap().cash(), before);
    }

    #[test]
    fn cancel_restores_reservation_and_removes_from_book() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 1_000.0, 0)], 0);
        let before = ledger.account(1).unwrap().cash();

        engine.process_new_order(new_order(1, 1, OrderType::Limit, Side::Buy, 5, Some(100_00)), &mut ledger, 0, 0);
        let cancelled = engine.cancel_order(1, 1, &mut ledger).unwrap();

        assert_eq!(cancelled.end_reason(), OrderEndReason::Cancelled);
        assert!(!engine.book().contains(1));
        assert_eq!(ledger.account(1).unwrap().cash(), before);
    }

    #[test]
    fn cancel_is_silent_for_foreign_agent() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 1_000.0, 0)], 0);
        engine.process_new_order(new_order(1, 1, OrderType::Limit, Side::Buy, 5, Some(100_00)), &mut ledger, 0, 0);
        assert!(engine.cancel_order(1, 2, &mut ledger).is_none());
        assert!(engine.book().contains(1));
    }

    #[test]
    fn expire_session_drains_book_and_resets_macro_accumulators() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 1_000.0, 0), (2, 0.0, 5)], 0);

        engine.process_new_order(new_order(1, 1, OrderType::Limit, Side::Buy, 5, Some(99_00)), &mut ledger, 0, 0);
        engine.process_new_order(new_order(2, 2, OrderType::Limit, Side::Sell, 5, Some(101_00)), &mut ledger, 0, 1);

        let terminated = engine.expire_session(&mut ledger);
        assert_eq!(terminated.len(), 2);
        assert!(terminated.iter().all(|o| o.end_reason() == OrderEndReason::Expired));
        assert_eq!(engine.book().best_bid_price(), None);
        assert_eq!(engine.book().best_ask_price(), None);

        // idempotent on an already-empty book
        assert!(engine.expire_session(&mut ledger).is_empty());
    }

    #[test]
    fn market_data_reports_micro_price_and_resets_micro_accumulators() {
        let mut engine = CdaEngine::new(0);
        let mut ledger = ledger_with(&[(1, 0.0, 10), (2, 10_000.0, 0)], 0);

        engine.process_new_order(new_order(1, 1, OrderType::Limit, Side::Sell, 10, Some(100_00)), &mut ledger, 0, 0);
        engine.process_new_order(new_order(2, 2, OrderType::Limit, Side::Buy, 4, Some(100_00)), &mut ledger, 0, 1);

        let snapshot = engine.get_market_data(0, 1, 0.0, 5);
        assert_eq!(snapshot.last_traded_price, Some(100_00));
        assert_eq!(snapshot.trade_volume, 4);
        assert_eq!(snapshot.l1_asks, Some((100_00, 6, 1)));

        let second = engine.get_market_data(0, 2, 0.0, 5);
        assert_eq!(second.last_traded_price, None, "last trade resets after being reported");
        assert_eq!(second.trade_volume, 0);
    }
}
