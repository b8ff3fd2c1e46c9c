//! Market Simulation Core
//!
//! A deterministic, tick-driven continuous double auction for a single
//! instrument: order book matching with price-time priority, integer-exact
//! cash/share settlement, a term-deposit calendar, a stochastic
//! true-value/short-rate economy, and periodic L1/L2 market data.
//!
//! # Architecture
//!
//! - **time**: the two-level `(macro, micro)` hybrid tick counter
//! - **money**: fixed-point conversion and fee arithmetic
//! - **rng**: deterministic seedable PRNG (xorshift64* + Gaussian)
//! - **economy**: lazy true-value/short-rate/deposit-curve trajectory
//! - **book**: the price-time priority order book
//! - **settlement**: accounts, reservations, trade settlement, deposits
//! - **engine**: the CDA matching core
//! - **storage**: the narrow append-only persistence contract
//! - **views**: human-unit read-only projections
//! - **facade**: `Environment`, the single entry point a driver calls
//!
//! # Critical invariants
//!
//! 1. All money values participating in conservation math are `i64`,
//!    scaled by a configured fixed-point factor `S`; floats only appear
//!    in views and configuration.
//! 2. All randomness is deterministic (seeded RNG) -- no `rand`/`rand_distr`.
//! 3. The core is single-threaded cooperative: no operation suspends
//!    mid-mutation of book or account state.

pub mod book;
pub mod config;
pub mod economy;
pub mod engine;
pub mod events;
pub mod facade;
pub mod models;
pub mod money;
pub mod rng;
pub mod settlement;
pub mod storage;
pub mod time;
pub mod views;

pub use config::{EconomyScenario, EnvironmentConfig, SimulationConfig};
pub use engine::{CdaEngine, MatchOutcome};
pub use events::{EventLog, SimEvent};
pub use facade::Environment;
pub use rng::RngManager;
pub use settlement::SettlementLedger;
pub use storage::{InMemoryStorageSink, StorageSink};
pub use time::HybridTime;
