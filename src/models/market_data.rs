//! A single `(macro, micro)` market data snapshot: L1/L2 book state,
//! trade summary, and VWAP accumulators, as built by
//! `CdaEngine::get_market_data`.

use serde::{Deserialize, Serialize};

/// `(price, size, order_count)` at one book level.
pub type BookLevel = (i64, i64, usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub timestamp: f64,
    pub macro_tick: usize,
    pub micro_tick: usize,

    pub trade_count: u64,
    pub trade_volume: i64,

    pub last_traded_price: Option<i64>,
    pub last_trade_size: Option<i64>,

    pub l1_bids: Option<BookLevel>,
    pub l1_asks: Option<BookLevel>,

    pub spread: Option<i64>,
    pub mid_price: Option<i64>,
    pub micro_price: Option<i64>,

    pub l2_bids: Option<Vec<BookLevel>>,
    pub l2_asks: Option<Vec<BookLevel>>,

    pub n: usize,
    pub bids_depth_n: i64,
    pub asks_depth_n: i64,
    pub imbalance_n: Option<f64>,

    pub vwap_macro: Option<i64>,
    pub vwap_micro: Option<i64>,
}
