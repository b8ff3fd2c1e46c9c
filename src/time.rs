//! Hybrid simulation time: a two-level tick counter.
//!
//! A macro tick is the simulation "round"; a micro tick is an intra-round
//! sequencer. `micro` carries into `macro` on overflow, lexicographically
//! ordering `(macro, micro)` pairs the way the rest of the crate expects.

use serde::{Deserialize, Serialize};

/// Two-level hybrid tick counter `(macro, micro)`.
///
/// # Example
/// ```
/// use market_sim_core::time::HybridTime;
///
/// let mut time = HybridTime::new(0, 0, 10, 4);
/// assert_eq!(time.macro_tick(), 0);
/// assert_eq!(time.micro_tick(), 0);
///
/// time.step();
/// assert_eq!(time.as_tuple(), (0, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HybridTime {
    macro_tick: usize,
    micro_tick: usize,
    simulation_macro_tick: usize,
    simulation_micro_tick: usize,
}

impl HybridTime {
    /// Create a new hybrid time counter.
    ///
    /// # Panics
    /// Panics if `simulation_micro_tick` is zero, or if the initial
    /// position is already out of bounds.
    pub fn new(
        init_macro_tick: usize,
        init_micro_tick: usize,
        simulation_macro_tick: usize,
        simulation_micro_tick: usize,
    ) -> Self {
        assert!(simulation_micro_tick > 0, "simulation_micro_tick must be positive");
        assert!(
            init_macro_tick < simulation_macro_tick,
            "init_macro_tick must be within the simulation horizon"
        );
        assert!(
            init_micro_tick < simulation_micro_tick,
            "init_micro_tick must be within a macro tick's span"
        );
        Self {
            macro_tick: init_macro_tick,
            micro_tick: init_micro_tick,
            simulation_macro_tick,
            simulation_micro_tick,
        }
    }

    pub fn macro_tick(&self) -> usize {
        self.macro_tick
    }

    pub fn micro_tick(&self) -> usize {
        self.micro_tick
    }

    pub fn as_tuple(&self) -> (usize, usize) {
        (self.macro_tick, self.micro_tick)
    }

    pub fn simulation_macro_tick(&self) -> usize {
        self.simulation_macro_tick
    }

    pub fn simulation_micro_tick(&self) -> usize {
        self.simulation_micro_tick
    }

    /// Advance one micro tick, carrying into the macro tick on overflow.
    ///
    /// Returns `false` once the counter has advanced past the simulation
    /// horizon (`macro_tick == simulation_macro_tick`); the driver is
    /// expected to stop calling `step` at that point.
    pub fn step(&mut self) -> bool {
        self.micro_tick += 1;
        if self.micro_tick == self.simulation_micro_tick {
            self.micro_tick = 0;
            self.macro_tick += 1;
        }
        self.macro_tick < self.simulation_macro_tick
    }

    /// True once the current position is at or past the simulation horizon.
    pub fn is_exhausted(&self) -> bool {
        self.macro_tick >= self.simulation_macro_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_micro_into_macro() {
        let mut t = HybridTime::new(0, 0, 10, 4);
        t.step();
        t.step();
        t.step();
        assert_eq!(t.as_tuple(), (0, 3));
        t.step();
        assert_eq!(t.as_tuple(), (1, 0));
    }

    #[test]
    fn step_reports_exhaustion() {
        let mut t = HybridTime::new(0, 0, 2, 2);
        assert!(t.step()); // (0,1)
        assert!(t.step()); // (1,0)
        assert!(t.step()); // (1,1)
        assert!(!t.step()); // (2,0) -- past the horizon
        assert!(t.is_exhausted());
    }

    #[test]
    #[should_panic(expected = "simulation_micro_tick must be positive")]
    fn zero_micro_tick_panics() {
        HybridTime::new(0, 0, 10, 0);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = HybridTime::new(1, 3, 10, 5);
        let b = HybridTime::new(2, 0, 10, 5);
        assert!(a < b);
    }
}
