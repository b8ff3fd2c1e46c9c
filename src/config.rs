//! Configuration structs, validated at construction.
//!
//! No file parsing or environment variable reads happen here (that is an
//! external collaborator's job, per spec). These are plain immutable
//! structs passed by reference into component constructors -- no
//! implicit globals, no process-wide singleton read from deep inside the
//! matching loop.

use serde::{Deserialize, Serialize};

/// Environment-level configuration: fixed-point scale, book depth
/// reported in market data, and the fee schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Decimal fixed-point scale `S` (e.g. 100 for cent precision).
    pub price_scale: i64,
    /// Number of L2 book levels aggregated into `bids_depth_N`/`asks_depth_N`.
    pub insight_l2_depth: usize,
    /// Fee rate in parts-per-million of trade notional.
    pub fee_rate_ppm: i64,
    pub economy_scenario: EconomyScenario,
}

impl EnvironmentConfig {
    pub fn new(
        price_scale: i64,
        insight_l2_depth: usize,
        fee_rate_ppm: i64,
        economy_scenario: EconomyScenario,
    ) -> Self {
        assert!(price_scale > 0, "price_scale must be positive");
        assert!(insight_l2_depth > 0, "insight_l2_depth must be positive");
        assert!(fee_rate_ppm >= 0, "fee_rate_ppm must be non-negative");
        Self {
            price_scale,
            insight_l2_depth,
            fee_rate_ppm,
            economy_scenario,
        }
    }
}

/// Hybrid-time moduli and initial tick position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub simulation_macro_tick: usize,
    pub simulation_micro_tick: usize,
    pub init_macro_tick: usize,
    pub init_micro_tick: usize,
}

impl SimulationConfig {
    pub fn new(
        simulation_macro_tick: usize,
        simulation_micro_tick: usize,
        init_macro_tick: usize,
        init_micro_tick: usize,
    ) -> Self {
        assert!(simulation_macro_tick > 0, "simulation_macro_tick must be positive");
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
            simulation_macro_tick,
            simulation_micro_tick,
            init_macro_tick,
            init_micro_tick,
        }
    }
}

/// Parameters of the stochastic true-value / short-rate / width economy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyScenario {
    pub seed: u64,

    pub tv_initial: f64,
    pub tv_long_run_mean: f64,
    pub tv_drift: f64,
    pub tv_mean_reversion: f64,
    pub tv_vol: f64,

    pub r_initial: f64,
    pub r_long_run_mean: f64,
    pub r_mean_reversion: f64,
    pub r_vol: f64,

    pub tv_interval_base_width: f64,
    pub tv_interval_vol: f64,

    pub term_curve_slope: f64,
    pub term_curve_curvature: f64,

    pub deposit_terms: Vec<usize>,
}

impl EconomyScenario {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seed: u64,
        tv_initial: f64,
        tv_long_run_mean: f64,
        tv_drift: f64,
        tv_mean_reversion: f64,
        tv_vol: f64,
        r_initial: f64,
        r_long_run_mean: f64,
        r_mean_reversion: f64,
        r_vol: f64,
        tv_interval_base_width: f64,
        tv_interval_vol: f64,
        term_curve_slope: f64,
        term_curve_curvature: f64,
        deposit_terms: Vec<usize>,
    ) -> Self {
        assert!(!deposit_terms.is_empty(), "deposit_terms must be non-empty");
        Self {
            seed,
            tv_initial,
            tv_long_run_mean,
            tv_drift,
            tv_mean_reversion,
            tv_vol,
            r_initial,
            r_long_run_mean,
            r_mean_reversion,
            r_vol,
            tv_interval_base_width,
            tv_interval_vol,
            term_curve_slope,
            term_curve_curvature,
            deposit_terms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> EconomyScenario {
        EconomyScenario::new(
            42, 100.0, 100.0, 0.0, 0.1, 1.0, 0.02, 0.02, 0.1, 0.001, 2.0, 0.5, 0.0, 0.0,
            vec![1, 3, 6],
        )
    }

    #[test]
    #[should_panic(expected = "price_scale must be positive")]
    fn rejects_zero_scale() {
        EnvironmentConfig::new(0, 5, 0, scenario());
    }

    #[test]
    #[should_panic(expected = "init_macro_tick must be within the simulation horizon")]
    fn rejects_init_past_horizon() {
        SimulationConfig::new(10, 4, 10, 0);
    }

    #[test]
    #[should_panic(expected = "deposit_terms must be non-empty")]
    fn rejects_empty_terms() {
        EconomyScenario::new(
            1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, vec![],
        );
    }
}
