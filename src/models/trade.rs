//! An executed match between a resting (maker) order and an incoming
//! (taker) order. Immutable once constructed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: u64,
    pub macro_tick: usize,
    pub micro_tick: usize,

    pub buyer_agent_id: u64,
    pub buy_order_id: u64,
    pub seller_agent_id: u64,
    pub sell_order_id: u64,

    pub price: i64,
    pub quantity: i64,
    pub fee: i64,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trade_id: u64,
        macro_tick: usize,
        micro_tick: usize,
        buyer_agent_id: u64,
        buy_order_id: u64,
        seller_agent_id: u64,
        sell_order_id: u64,
        price: i64,
        quantity: i64,
        fee: i64,
    ) -> Self {
        assert!(price > 0, "trade price must be positive");
        assert!(quantity > 0, "trade quantity must be positive");
        assert!(fee >= 0, "trade fee must be non-negative");
        Self {
            trade_id,
            macro_tick,
            micro_tick,
            buyer_agent_id,
            buy_order_id,
            seller_agent_id,
            sell_order_id,
            price,
            quantity,
            fee,
        }
    }
}
