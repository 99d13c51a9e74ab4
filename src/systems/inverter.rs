//! Model inversion: which population would cost the target per tick, and
//! how fast must spawners produce to get there?
//!
//! Every feature of the live status is held fixed except population and
//! population², and the search walks a normalized population value `p`:
//!
//! - close enough to the target: accept `p`
//! - predicted above target: `upper = p`
//! - predicted below target: `upper += (upper - lower) / 2`, then `lower = p`
//!
//! then probes the midpoint. The below-target branch grows the bracket
//! instead of shrinking it, so the search can reach populations beyond the
//! range seen in training. When the model is not monotone in population
//! that same branch can leave the root outside the bracket; the search then
//! runs out of iterations and the caller falls back.

use tracing::trace;

use crate::error::{ControllerError, Result};
use crate::mechanics::control;
use crate::systems::normalizer::Normalizer;
use crate::systems::sample::{Feature, Sample};
use crate::systems::trainer::Model;

/// Latest instantaneous status published by the simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveStatus {
    /// Raw (unnormalized) features of the latest tick.
    pub snapshot: Sample,
    /// Spawning controllers sharing the recommended interval.
    pub spawners: usize,
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self { snapshot: Sample::new(), spawners: 1 }
    }
}

/// Search limits.
#[derive(Clone, Copy, Debug)]
pub struct InversionLimits {
    pub tolerance: f64,
    pub max_iterations: usize,
}

/// Normalized population value at which `model` predicts `target`.
///
/// `status` must already be normalized; its population columns are
/// overwritten per probe.
pub fn invert(
    model: &Model,
    normalizer: &Normalizer,
    status: &Sample,
    target: f64,
    limits: InversionLimits,
) -> Result<f64> {
    let mut probe = *status;
    let (mut lower, mut pivot, mut upper) = (-1.0_f64, 0.0_f64, 1.0_f64);
    let mut predicted = f64::NAN;

    for iteration in 0..limits.max_iterations {
        let population = normalizer.denormalize_value(Feature::Population, pivot);
        probe.set(Feature::Population, pivot);
        probe.set(
            Feature::PopulationSquared,
            normalizer.normalize_value(Feature::PopulationSquared, population * population),
        );
        predicted = model.predict(&probe.features)?;

        if (predicted - target).abs() < limits.tolerance {
            trace!(iteration, pivot, predicted, "inversion converged");
            return Ok(pivot);
        }
        if predicted > target {
            upper = pivot;
        } else {
            upper += (upper - lower) / 2.0;
            lower = pivot;
        }
        pivot = (upper + lower) / 2.0;
    }

    Err(ControllerError::InversionUnresolved {
        iterations: limits.max_iterations,
        last_prediction: predicted,
    })
}

/// A spawn-interval recommendation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Recommendation {
    /// Population the model says meets the target (raw units).
    pub population: f64,
    /// `population` minus the live population.
    pub delta: f64,
    /// Seconds between spawns, inside the configured bounds.
    pub interval: f64,
    /// `false` when the search failed and the fallback was used.
    pub resolved: bool,
}

/// Stateful wrapper around [`invert`] tracking a rolling failure count.
#[derive(Clone, Debug)]
pub struct RateInverter {
    limits: InversionLimits,
    bounds: (f64, f64),
    fallback: f64,
    failures: usize,
}

impl RateInverter {
    pub fn new(limits: InversionLimits, bounds: (f64, f64), fallback: f64) -> Self {
        Self { limits, bounds, fallback, failures: 0 }
    }

    pub fn failure_count(&self) -> usize {
        self.failures
    }

    pub fn reset_failures(&mut self) {
        self.failures = 0;
    }

    /// Recommend a spawn interval for reaching `target` cost from `status`.
    pub fn recommend(
        &mut self,
        model: &Model,
        normalizer: &Normalizer,
        status: &LiveStatus,
        target: f64,
    ) -> Result<Recommendation> {
        let normalized = normalizer.normalize(&status.snapshot);
        let current = status.snapshot.get(Feature::Population);

        match invert(model, normalizer, &normalized, target, self.limits) {
            Ok(pivot) => {
                self.failures = self.failures.saturating_sub(1);
                let population = normalizer.denormalize_value(Feature::Population, pivot);
                let delta = population - current;
                let (lo, hi) = self.bounds;
                Ok(Recommendation {
                    population,
                    delta,
                    interval: control::spawn_interval(status.spawners, delta, lo, hi, self.fallback),
                    resolved: true,
                })
            }
            Err(ControllerError::InversionUnresolved { last_prediction, .. }) => {
                self.failures += 1;
                trace!(failures = self.failures, last_prediction, "inversion fell back");
                Ok(Recommendation {
                    population: 0.0,
                    delta: -current,
                    interval: self.fallback,
                    resolved: false,
                })
            }
            Err(e) => Err(e),
        }
    }
}
