//! Per-macro-tick snapshot of the economy process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyInsight {
    pub macro_tick: usize,
    pub true_value: i64,
    pub short_rate: f64,
    pub width: f64,
    pub tv_interval: (i64, i64),
    /// term (in macro ticks) -> rate
    pub deposit_rates: BTreeMap<usize, f64>,
}
