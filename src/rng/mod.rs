//! Deterministic random number generation.
//!
//! CRITICAL: all randomness drawn by the economy process MUST go through
//! this module. No other crate's RNG (`rand`, `rand_distr`, ...) appears
//! anywhere in this codebase's conservation or economy math.

mod xorshift;

pub use xorshift::RngManager;
