//! Regularized least-squares training.
//!
//! ```text
//! cost(θ) = ( Σ(Xθ − y)² + λ·Σ_{i≥1} θ_i² ) / 2N
//! ∇(θ)    = ( Xᵀ(Xθ − y) + λ·θ_reg ) / N        θ_reg = θ with θ_0 zeroed
//! ```
//!
//! [`fit`] does not follow the gradient blindly. Each iteration takes one
//! exploratory step from a random earlier candidate with a random fraction
//! of the learning rate, and one exploiting step from the cheapest candidate
//! with the full rate. The learning rate halves when the exploiting step
//! fails to beat the best cost and otherwise drifts halfway back toward its
//! previous value. Every evaluation is kept and the cheapest one wins, so
//! the result is never worse than the starting point. The price is two cost
//! and gradient evaluations per iteration instead of one; in exchange the
//! search can climb out of a poor basin through the exploratory branch.

use bevy_prng::WyRand;
use tracing::debug;

use crate::error::{ControllerError, Result};
use crate::mechanics::{Matrix, stoch};
use crate::systems::dataset::Dataset;
use crate::systems::sample::{FEATURE_COUNT, Feature, Sample};

/// Linear-in-features cost model.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Column of `FEATURE_COUNT` coefficients, bias first.
    theta: Matrix,
    pub lambda: f64,
}

impl Model {
    pub fn zeroed(lambda: f64) -> Self {
        Self { theta: Matrix::zeros(FEATURE_COUNT, 1), lambda }
    }

    pub fn from_coefficients(coefficients: [f64; FEATURE_COUNT], lambda: f64) -> Self {
        Self { theta: Matrix::column(&coefficients), lambda }
    }

    pub fn theta(&self) -> &Matrix {
        &self.theta
    }

    pub fn coefficient(&self, feature: Feature) -> f64 {
        self.theta.as_slice()[feature.index()]
    }

    /// `θᵀ · features` for a normalized feature vector.
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64> {
        let x = Matrix::column(features);
        Ok(self.theta.transpose().multiply(&x)?.sum())
    }
}

/// Regularized mean-squared error of `theta` on `(x, y)`.
pub fn cost(x: &Matrix, y: &Matrix, theta: &Matrix, lambda: f64) -> Result<f64> {
    let n = y.rows();
    if n == 0 {
        return Err(ControllerError::InsufficientData { have: 0, need: 1 });
    }
    let squared = x.multiply(theta)?.subtract(y)?.power(2.0).sum();
    let mut penalty = theta.power(2.0);
    penalty.set(0, 0, 0.0)?;
    Ok((squared + lambda * penalty.sum()) / (2.0 * n as f64))
}

/// Gradient of [`cost`] with respect to `theta`.
pub fn gradient(x: &Matrix, y: &Matrix, theta: &Matrix, lambda: f64) -> Result<Matrix> {
    let n = y.rows();
    if n == 0 {
        return Err(ControllerError::InsufficientData { have: 0, need: 1 });
    }
    let mut reg = theta.scale(lambda);
    reg.set(0, 0, 0.0)?;
    let residual = x.multiply(theta)?.subtract(y)?;
    Ok(x.transpose().multiply(&residual)?.add(&reg)?.scale(1.0 / n as f64))
}

/// Cost on held-out rows. Zero when there are fewer than two: that means
/// "no test set", not a perfect fit.
pub fn held_out_cost(test: &[Sample], theta: &Matrix, lambda: f64) -> Result<f64> {
    if test.len() <= 1 {
        return Ok(0.0);
    }
    cost(&Matrix::features(test), &Matrix::costs(test), theta, lambda)
}

/// One evaluated point of a training run.
#[derive(Clone, Debug)]
struct Candidate {
    theta: Matrix,
    gradient: Matrix,
    cost: f64,
}

fn evaluate(x: &Matrix, y: &Matrix, theta: Matrix, lambda: f64) -> Result<Candidate> {
    let gradient = gradient(x, y, &theta, lambda)?;
    let cost = cost(x, y, &theta, lambda)?;
    Ok(Candidate { theta, gradient, cost })
}

fn cheapest(candidates: &[Candidate]) -> usize {
    let mut best = 0;
    for (i, c) in candidates.iter().enumerate().skip(1) {
        if c.cost < candidates[best].cost {
            best = i;
        }
    }
    best
}

/// Result of a training run.
#[derive(Clone, Debug)]
pub struct Fit {
    pub model: Model,
    /// Training cost of `model`.
    pub train_cost: f64,
    /// Held-out cost of `model`; see [`held_out_cost`].
    pub test_cost: f64,
    /// Cost and gradient evaluations spent.
    pub evaluations: usize,
}

/// Fit `start` to the dataset's training rows for `iterations` rounds.
pub fn fit(data: &Dataset, start: &Model, iterations: usize, rng: &mut WyRand) -> Result<Fit> {
    let (x, y, lambda) = (data.x(), data.y(), start.lambda);
    if y.rows() == 0 {
        return Err(ControllerError::InsufficientData { have: 0, need: 1 });
    }

    let mut candidates = Vec::with_capacity(2 * iterations + 1);
    candidates.push(evaluate(x, y, start.theta.clone(), lambda)?);

    // More iterations can afford a bolder first step.
    let mut rate = (iterations as f64).sqrt() / 100.0;
    let mut previous_rate = rate;

    for _ in 0..iterations {
        let from = &candidates[stoch::index(rng, candidates.len())];
        let explore = from.theta.subtract(&from.gradient.scale(rate * stoch::unit(rng)))?;
        candidates.push(evaluate(x, y, explore, lambda)?);

        let best = &candidates[cheapest(&candidates)];
        let best_cost = best.cost;
        let exploit = best.theta.subtract(&best.gradient.scale(rate))?;
        let step = evaluate(x, y, exploit, lambda)?;
        let improved = step.cost <= best_cost;
        candidates.push(step);

        if improved {
            rate = (previous_rate + rate) / 2.0;
        } else {
            previous_rate = rate;
            rate *= 0.5;
        }
    }

    let evaluations = candidates.len();
    let best = candidates.swap_remove(cheapest(&candidates));
    let test_cost = held_out_cost(data.test(), &best.theta, lambda)?;
    Ok(Fit {
        model: Model { theta: best.theta, lambda },
        train_cost: best.cost,
        test_cost,
        evaluations,
    })
}

/// Knobs for [`select_regularization`].
#[derive(Clone, Copy, Debug)]
pub struct LambdaSearch {
    pub trials: usize,
    pub trial_iterations: usize,
    pub refine_iterations: usize,
}

/// Pick λ by held-out cost over randomized trials, each fit from zero, then
/// refine the winner.
///
/// The first trial keeps the incoming λ; each later trial perturbs the
/// running value to `1 + λ·0.5·(1 + r1 + r2)` first.
pub fn select_regularization(
    data: &Dataset,
    lambda: f64,
    search: LambdaSearch,
    rng: &mut WyRand,
) -> Result<Fit> {
    let mut lambda = lambda;
    let mut winner: Option<(Fit, f64)> = None;

    for trial in 0..search.trials.max(1) {
        if trial > 0 {
            lambda = 1.0 + lambda * 0.5 * (1.0 + stoch::unit(rng) + stoch::unit(rng));
        }
        let trial_fit = fit(data, &Model::zeroed(lambda), search.trial_iterations, rng)?;
        let score = trial_fit.test_cost;
        if winner.as_ref().is_none_or(|(_, best)| score < *best) {
            winner = Some((trial_fit, score));
        }
    }

    let (best, score) = winner.ok_or(ControllerError::InsufficientData { have: 0, need: 1 })?;
    debug!(lambda = best.model.lambda, held_out = score, "regularization selected");
    fit(data, &best.model, search.refine_iterations, rng)
}
