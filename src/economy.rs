//! The stochastic economy process: lazily-extended true value, short
//! rate, and TV-interval-width trajectories, plus the deposit term
//! curve.
//!
//! Determinism contract: a single seeded [`RngManager`] draws, per
//! extended macro tick and in this exact order, TV noise, rate noise,
//! then width noise; the TV-interval uniform is drawn once per tick,
//! lazily, the first time that tick's interval is requested. Every
//! public read calls `step` first so callers never observe a partially
//! extended trajectory.

use std::collections::BTreeMap;

use crate::config::EconomyScenario;
use crate::models::EconomyInsight;
use crate::money::to_fx;
use crate::rng::RngManager;

pub struct EconomyProcess {
    scenario: EconomyScenario,
    rng: RngManager,

    tv: Vec<f64>,
    r: Vec<f64>,
    width: Vec<f64>,
    interval_low: Vec<Option<f64>>,
    interval_high: Vec<Option<f64>>,

    max_generated_tick: usize,
}

impl EconomyProcess {
    pub fn new(scenario: EconomyScenario) -> Self {
        let mut rng = RngManager::new(scenario.seed);
        let width0 = Self::sample_width(&scenario, &mut rng);
        Self {
            tv: vec![scenario.tv_initial],
            r: vec![scenario.r_initial],
            width: vec![width0],
            interval_low: vec![None],
            interval_high: vec![None],
            max_generated_tick: 0,
            scenario,
            rng,
        }
    }

    fn step_tv(scenario: &EconomyScenario, rng: &mut RngManager, tv_t: f64) -> f64 {
        let eps = rng.gauss();
        tv_t + scenario.tv_mean_reversion * (scenario.tv_long_run_mean - tv_t)
            + scenario.tv_drift
            + scenario.tv_vol * eps
    }

    fn step_r(scenario: &EconomyScenario, rng: &mut RngManager, r_t: f64) -> f64 {
        let eps = rng.gauss();
        let r_next = r_t + scenario.r_mean_reversion * (scenario.r_long_run_mean - r_t) + scenario.r_vol * eps;
        r_next.max(1e-8)
    }

    fn sample_width(scenario: &EconomyScenario, rng: &mut RngManager) -> f64 {
        let eps = rng.gauss();
        let raw = scenario.tv_interval_base_width + scenario.tv_interval_vol * eps;
        raw.max(1e-8)
    }

    /// Extend the trajectory one step at a time up to `macro_tick`, if
    /// it has not already been generated. No-op (and no RNG draws) if
    /// `macro_tick` is already covered.
    pub fn step(&mut self, macro_tick: usize) {
        if macro_tick <= self.max_generated_tick {
            return;
        }
        for t in self.max_generated_tick..macro_tick {
            let tv_next = Self::step_tv(&self.scenario, &mut self.rng, self.tv[t]);
            let r_next = Self::step_r(&self.scenario, &mut self.rng, self.r[t]);
            let w_next = Self::sample_width(&self.scenario, &mut self.rng);
            self.tv.push(tv_next);
            self.r.push(r_next);
            self.width.push(w_next);
            self.interval_low.push(None);
            self.interval_high.push(None);
        }
        self.max_generated_tick = macro_tick;
    }

    pub fn true_value(&mut self, macro_tick: usize) -> f64 {
        self.step(macro_tick);
        self.tv[macro_tick]
    }

    pub fn short_rate(&mut self, macro_tick: usize) -> f64 {
        self.step(macro_tick);
        self.r[macro_tick]
    }

    pub fn width(&mut self, macro_tick: usize) -> f64 {
        self.step(macro_tick);
        self.width[macro_tick]
    }

    /// `(lower, upper)` true-value interval for `macro_tick`, cached
    /// after the first call per tick.
    pub fn tv_interval(&mut self, macro_tick: usize) -> (f64, f64) {
        self.step(macro_tick);
        if let (Some(lower), Some(upper)) = (self.interval_low[macro_tick], self.interval_high[macro_tick]) {
            return (lower, upper);
        }
        let tv = self.tv[macro_tick];
        let width = self.width[macro_tick];
        let z = self.rng.next_f64();
        let lower = tv - z * width;
        let upper = tv + (1.0 - z) * width;
        self.interval_low[macro_tick] = Some(lower);
        self.interval_high[macro_tick] = Some(upper);
        (lower, upper)
    }

    /// `rate(term) = max(0, r_t + s1*term + s2*term^2)` for every
    /// configured deposit term.
    pub fn deposit_rates(&mut self, macro_tick: usize) -> BTreeMap<usize, f64> {
        self.step(macro_tick);
        let r_t = self.r[macro_tick];
        self.scenario
            .deposit_terms
            .iter()
            .map(|&term| {
                let x = term as f64;
                let rate = r_t + self.scenario.term_curve_slope * x + self.scenario.term_curve_curvature * x * x;
                (term, rate.max(0.0))
            })
            .collect()
    }

    /// The full per-tick snapshot, with money fields converted to the
    /// fixed-point scale.
    pub fn insight(&mut self, macro_tick: usize, price_scale: i64) -> EconomyInsight {
        let true_value = self.true_value(macro_tick);
        let short_rate = self.short_rate(macro_tick);
        let width = self.width(macro_tick);
        let (lower, upper) = self.tv_interval(macro_tick);
        let deposit_rates = self.deposit_rates(macro_tick);

        EconomyInsight {
            macro_tick,
            true_value: to_fx(true_value, price_scale),
            short_rate,
            width,
            tv_interval: (to_fx(lower, price_scale), to_fx(upper, price_scale)),
            deposit_rates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> EconomyScenario {
        EconomyScenario::new(
            42, 100.0, 100.0, 0.0, 0.1, 1.0, 0.02, 0.02, 0.1, 0.001, 2.0, 0.5, 0.0, 0.0,
            vec![1, 3, 6, 12],
        )
    }

    #[test]
    fn deterministic_for_same_seed() {
        let mut a = EconomyProcess::new(scenario());
        let mut b = EconomyProcess::new(scenario());
        for t in 0..20 {
            assert_eq!(a.true_value(t), b.true_value(t));
            assert_eq!(a.short_rate(t), b.short_rate(t));
            assert_eq!(a.tv_interval(t), b.tv_interval(t));
        }
    }

    #[test]
    fn interval_is_cached_across_calls() {
        let mut econ = EconomyProcess::new(scenario());
        let first = econ.tv_interval(5);
        let second = econ.tv_interval(5);
        assert_eq!(first, second);
    }

    #[test]
    fn rereading_lower_tick_does_not_redraw() {
        let mut econ = EconomyProcess::new(scenario());
        econ.step(10);
        let tv10_first = econ.true_value(10);
        // stepping to the same horizon again must not advance anything
        econ.step(10);
        let tv10_second = econ.true_value(10);
        assert_eq!(tv10_first, tv10_second);
    }

    #[test]
    fn short_rate_floored() {
        let mut econ = EconomyProcess::new(scenario());
        for t in 0..200 {
            assert!(econ.short_rate(t) >= 1e-8);
        }
    }

    #[test]
    fn deposit_rates_cover_every_term() {
        let mut econ = EconomyProcess::new(scenario());
        let rates = econ.deposit_rates(0);
        assert_eq!(rates.len(), 4);
        for rate in rates.values() {
            assert!(*rate >= 0.0);
        }
    }
}
