//! Composable per-feature affine normalization.
//!
//! `normalized = (raw + mu) * sigma`. A recompute derives a delta transform
//! from the current (already normalized) rows, folds it into the running
//! `(mu, sigma)`, and rewrites the rows with the delta only. Rows therefore
//! stay consistent with the running transform without keeping raw copies.

use tracing::debug;

use crate::error::{ControllerError, Result};
use crate::systems::sample::{FEATURE_COUNT, Feature, Sample};

#[derive(Clone, Debug, PartialEq)]
pub struct Normalizer {
    mu: [f64; FEATURE_COUNT],
    sigma: [f64; FEATURE_COUNT],
}

impl Default for Normalizer {
    fn default() -> Self {
        Self { mu: [0.0; FEATURE_COUNT], sigma: [1.0; FEATURE_COUNT] }
    }
}

/// What a recompute did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recalibration {
    /// Features whose rows were all equal; their transform was left alone.
    pub degenerate: Vec<Feature>,
}

/// Delta shift and scale mapping `[min, max]` onto `[-1, 1]`.
pub fn rescale_bounds(feature: Feature, min: f64, max: f64) -> Result<(f64, f64)> {
    let spread = max - min;
    if !(spread > 0.0) || !spread.is_finite() {
        return Err(ControllerError::DegenerateFeature { feature, value: min });
    }
    Ok((-(max + min) / 2.0, 2.0 / spread))
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mu(&self, feature: Feature) -> f64 {
        self.mu[feature.index()]
    }

    #[inline]
    pub fn sigma(&self, feature: Feature) -> f64 {
        self.sigma[feature.index()]
    }

    #[inline]
    pub fn normalize_value(&self, feature: Feature, raw: f64) -> f64 {
        let i = feature.index();
        (raw + self.mu[i]) * self.sigma[i]
    }

    #[inline]
    pub fn denormalize_value(&self, feature: Feature, normalized: f64) -> f64 {
        let i = feature.index();
        normalized / self.sigma[i] - self.mu[i]
    }

    /// Map a raw sample into the current normalized space. Cost is untouched.
    pub fn normalize(&self, raw: &Sample) -> Sample {
        let mut out = *raw;
        for f in Feature::ALL.iter().skip(1) {
            out.set(*f, self.normalize_value(*f, raw.get(*f)));
        }
        out
    }

    /// Re-derive the transform from `rows` and rewrite them under it.
    pub fn recompute(&mut self, rows: &mut [Sample]) -> Recalibration {
        let mut report = Recalibration::default();
        if rows.is_empty() {
            return report;
        }

        for f in Feature::ALL.iter().skip(1).copied() {
            let i = f.index();
            let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r.features[i]), hi.max(r.features[i]))
            });

            let (delta_mu, delta_sigma) = match rescale_bounds(f, min, max) {
                Ok(d) => d,
                Err(e) => {
                    debug!(feature = f.name(), error = %e, "skipping rescale");
                    report.degenerate.push(f);
                    continue;
                }
            };

            // (raw + mu) * sigma + d_mu == (raw + mu + d_mu / sigma) * sigma
            self.mu[i] += delta_mu / self.sigma[i];
            self.sigma[i] *= delta_sigma;
            for r in rows.iter_mut() {
                r.features[i] = (r.features[i] + delta_mu) * delta_sigma;
            }
        }
        report
    }
}
