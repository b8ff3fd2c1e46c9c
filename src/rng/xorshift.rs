//! xorshift64* random number generator
//!
//! This is a fast, high-quality PRNG that is deterministic and suitable
//! for simulation purposes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed -> same sequence of random numbers. This is CRITICAL for:
//! - Debugging (reproduce exact simulation runs)
//! - Testing (verify behavior)
//! - Research (validate results across scenario reruns)

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*, extended with
/// a standard-normal draw for the economy process.
///
/// # Example
/// ```
/// use market_sim_core::rng::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let range_value = rng.range(0, 100); // [0, 100)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed. A zero seed is remapped to 1,
    /// since xorshift's all-zero state is a fixed point.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate the next random `u64`, advancing internal state.
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate a random value in range `[min, max)`.
    ///
    /// # Panics
    /// Panics if `min >= max`.
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");
        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Current RNG state, for checkpointing/replay.
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Random `f64` in `[0.0, 1.0)`.
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Draw from the standard normal distribution `N(0, 1)` via the
    /// Box-Muller transform, consuming two uniform draws.
    pub fn gauss(&mut self) -> f64 {
        // Avoid ln(0.0): next_f64() can return 0.0 but never 1.0.
        let mut u1 = self.next_f64();
        if u1 <= f64::EPSILON {
            u1 = f64::EPSILON;
        }
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range(100, 50);
    }

    #[test]
    fn test_next_f64_in_range() {
        let mut rng = RngManager::new(12345);
        for _ in 0..1000 {
            let val = rng.next_f64();
            assert!(val >= 0.0 && val < 1.0);
        }
    }

    #[test]
    fn test_next_f64_deterministic() {
        let mut rng1 = RngManager::new(99999);
        let mut rng2 = RngManager::new(99999);
        for _ in 0..100 {
            assert_eq!(rng1.next_f64(), rng2.next_f64());
        }
    }

    #[test]
    fn gauss_is_deterministic_and_roughly_standard() {
        let mut rng1 = RngManager::new(42);
        let mut rng2 = RngManager::new(42);
        let mut sum = 0.0;
        let n = 5000;
        for _ in 0..n {
            let a = rng1.gauss();
            let b = rng2.gauss();
            assert_eq!(a, b);
            sum += a;
        }
        let mean = sum / n as f64;
        assert!(mean.abs() < 0.1, "sample mean {mean} too far from 0");
    }
}
