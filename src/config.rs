//! Controller configuration.
//!
//! Defaults reproduce the tuning the controller was built around: a 25-sample
//! bootstrap, a 200-row training cap pruned back to 150, and spawn intervals
//! kept inside [0.01, 1.0] seconds.

use std::time::Duration;

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    /// Samples gathered before the first model is fit.
    pub bootstrap_samples: usize,
    /// Rebalance each time the total row count crosses a multiple of this.
    pub rebalance_every: usize,
    /// Hard cap on training rows; exceeding it forces a rebalance.
    pub train_cap: usize,
    /// Training size kept once at least `train_cap` rows are available.
    pub train_target: usize,

    /// Starting L2 strength.
    pub initial_lambda: f64,
    /// Regularization trials per resync.
    pub lambda_trials: usize,
    /// Fit iterations per regularization trial.
    pub trial_iterations: usize,
    /// Fit iterations spent refining the winning trial.
    pub refine_iterations: usize,
    /// Steady-state fit budget, drawn uniformly from `[lo, hi)`.
    pub fit_iterations: (usize, usize),

    /// Accept an inversion probe when `|predicted - target|` is below this.
    pub inversion_tolerance: f64,
    pub inversion_max_iterations: usize,

    /// Published interval bounds, seconds.
    pub interval_bounds: (f64, f64),
    /// Interval published before the first recommendation.
    pub initial_interval: f64,
    /// Interval used whenever no faster spawning is warranted.
    pub fallback_interval: f64,

    /// Consecutive-ish inversion failures tolerated before a forced resync.
    pub failure_limit: usize,
    /// A forced resync needs strictly more rows than this.
    pub failure_min_rows: usize,

    /// Per-tick processing cost the controller steers toward.
    pub default_target_cost: f64,

    /// Sleep while waiting for bootstrap data.
    pub idle_sleep: Duration,
    /// Sleep between steady-state iterations.
    pub pace_sleep: Duration,

    /// Simulation ticks aggregated into one sample.
    pub window_ticks: usize,

    /// Fixed RNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bootstrap_samples: 25,
            rebalance_every: 25,
            train_cap: 200,
            train_target: 150,
            initial_lambda: 2.0,
            lambda_trials: 10,
            trial_iterations: 100,
            refine_iterations: 200,
            fit_iterations: (50, 200),
            inversion_tolerance: 0.1,
            inversion_max_iterations: 1000,
            interval_bounds: (0.01, 1.0),
            initial_interval: 0.3,
            fallback_interval: 1.0,
            failure_limit: 100,
            failure_min_rows: 50,
            default_target_cost: 5.0,
            idle_sleep: Duration::from_millis(500),
            pace_sleep: Duration::from_millis(1),
            window_ticks: 100,
            seed: None,
        }
    }
}

impl ControllerConfig {
    /// Defaults with a fixed seed and no sleeping; handy for tests and replays.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            idle_sleep: Duration::from_millis(1),
            pace_sleep: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Training size to keep after a rebalance, given every row available.
    pub fn rebalance_target(&self, available: usize) -> usize {
        if available >= self.train_cap {
            self.train_target
        } else {
            available * 3 / 4
        }
    }
}
