//! Domain models for the market simulation core.

pub mod account;
pub mod deposit;
pub mod economy_insight;
pub mod market_data;
pub mod order;
pub mod trade;

pub use account::Account;
pub use deposit::Deposit;
pub use economy_insight::EconomyInsight;
pub use market_data::MarketData;
pub use order::{Order, OrderEndReason, OrderLifecycle, OrderType, Side};
pub use trade::Trade;
