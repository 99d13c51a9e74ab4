//! Controller state machine.
//!
//! `AwaitingBootstrap` gathers samples until the bootstrap count is queued,
//! then the one-time transition to `Trained` rebalances, selects λ and fits.
//! Each `Trained` step ingests whatever arrived, resyncs when the dataset
//! asks for it, fits briefly, and recommends a spawn interval.
//!
//! Everything here is owned by a single task; no locking.

use bevy_prng::WyRand;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::mechanics::stoch;
use crate::systems::dataset::Dataset;
use crate::systems::inverter::{InversionLimits, LiveStatus, RateInverter, Recommendation};
use crate::systems::sample::Sample;
use crate::systems::trainer::{self, Fit, LambdaSearch, Model};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingBootstrap,
    Trained,
}

/// Display-only view of the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostics {
    /// Training cost of the current model; 0 before bootstrap.
    pub fitting_error: f64,
    /// Held-out cost; 0 when there is no usable test set.
    pub test_error: f64,
    /// `-queued / bootstrap` while gathering, pinned at -1 once trained.
    pub bootstrap_progress: f64,
    pub failure_count: usize,
    pub lambda: f64,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Samples waiting in the ingestion queue.
    pub queued: usize,
    /// Samples dropped for carrying a non-finite value.
    pub rejected: usize,
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fitting_error > 0.0 {
            write!(f, "Fitting error: {:.4}", self.fitting_error)?;
            if self.test_error > 0.0 {
                write!(f, "\nTest error: {:.4}", self.test_error)
            } else {
                write!(f, "\nNo test set currently")
            }
        } else {
            write!(f, "Gathering data... {:.0}%", (self.bootstrap_progress * 100.0).abs())
        }
    }
}

/// What one [`ControllerState::step`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// Still gathering bootstrap samples.
    Gathering { queued: usize },
    /// Bootstrap finished on this step.
    Bootstrapped(Recommendation),
    /// Steady-state step; `ingested` may be zero.
    Adjusted { ingested: usize, recommendation: Recommendation },
}

impl Step {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            Step::Gathering { .. } => None,
            Step::Bootstrapped(r) => Some(r),
            Step::Adjusted { recommendation, .. } => Some(recommendation),
        }
    }
}

pub struct ControllerState {
    cfg: ControllerConfig,
    phase: Phase,
    pending: Vec<Sample>,
    dataset: Dataset,
    model: Model,
    inverter: RateInverter,
    rng: WyRand,
    interval: f64,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerState")
            .field("phase", &self.phase())
            .field("interval", &self.interval())
            .field("diagnostics", &self.diagnostics())
            .finish_non_exhaustive()
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

impl ControllerState {
    pub fn new(cfg: ControllerConfig) -> Self {
        let rng = stoch::seeded(cfg.seed.unwrap_or_else(clock_seed));
        let inverter = RateInverter::new(
            InversionLimits {
                tolerance: cfg.inversion_tolerance,
                max_iterations: cfg.inversion_max_iterations,
            },
            cfg.interval_bounds,
            cfg.fallback_interval,
        );
        let (lo, hi) = cfg.interval_bounds;
        Self {
            phase: Phase::AwaitingBootstrap,
            pending: Vec::with_capacity(cfg.bootstrap_samples),
            dataset: Dataset::new(cfg.rebalance_every, cfg.train_cap),
            model: Model::zeroed(cfg.initial_lambda),
            inverter,
            rng,
            interval: cfg.initial_interval.clamp(lo, hi),
            diagnostics: Diagnostics { lambda: cfg.initial_lambda, ..Diagnostics::default() },
            cfg,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    /// Seconds between spawns; always inside the configured bounds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn failure_count(&self) -> usize {
        self.inverter.failure_count()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Advance the state machine with newly drained samples.
    ///
    /// On any error the step is abandoned and the previous
    /// model and interval stay in effect.
    ///
    /// Samples with a non-finite cost or feature are dropped here and never
    /// count toward bootstrap or reach the dataset.
    pub fn step(&mut self, mut drained: Vec<Sample>, status: &LiveStatus, target: f64) -> Result<Step> {
        let received = drained.len();
        drained.retain(Sample::is_finite);
        if drained.len() < received {
            self.diagnostics.rejected += received - drained.len();
            warn!(dropped = received - drained.len(), "non-finite samples dropped");
        }
        match self.phase {
            Phase::AwaitingBootstrap => self.gather(drained, status, target),
            Phase::Trained => self.adjust(drained, status, target),
        }
    }

    fn gather(&mut self, drained: Vec<Sample>, status: &LiveStatus, target: f64) -> Result<Step> {
        self.pending.extend(drained);
        let need = self.cfg.bootstrap_samples;
        self.diagnostics.bootstrap_progress = -(self.pending.len() as f64) / need.max(1) as f64;

        if self.pending.len() < need {
            let err = ControllerError::InsufficientData { have: self.pending.len(), need };
            debug!(%err, "awaiting bootstrap");
            return Ok(Step::Gathering { queued: self.pending.len() });
        }

        let mut dataset = self.dataset.clone();
        for s in &self.pending {
            dataset.ingest(s);
        }
        dataset.rebalance(need, &mut self.rng);
        let selected = trainer::select_regularization(&dataset, self.model.lambda, self.search(), &mut self.rng)?;
        let fit = trainer::fit(&dataset, &selected.model, self.cfg.refine_iterations, &mut self.rng)?;

        self.dataset = dataset;
        self.pending.clear();
        self.commit(fit);
        self.phase = Phase::Trained;
        self.diagnostics.bootstrap_progress = -1.0;
        info!(
            samples = self.dataset.available(),
            lambda = self.model.lambda,
            fitting_error = self.diagnostics.fitting_error,
            "controller bootstrapped"
        );

        let rec = self.recommend(status, target)?;
        Ok(Step::Bootstrapped(rec))
    }

    fn adjust(&mut self, drained: Vec<Sample>, status: &LiveStatus, target: f64) -> Result<Step> {
        let ingested = drained.len();
        if ingested > 0 {
            let mut resync = false;
            for s in &drained {
                resync |= self.dataset.ingest(s);
            }
            if resync {
                self.resync()?;
            }
            let budget = stoch::range(&mut self.rng, self.cfg.fit_iterations.0, self.cfg.fit_iterations.1);
            let fit = trainer::fit(&self.dataset, &self.model, budget, &mut self.rng)?;
            self.commit(fit);
        }

        let recommendation = self.recommend(status, target)?;

        let available = self.dataset.available();
        if self.inverter.failure_count() > self.cfg.failure_limit && available > self.cfg.failure_min_rows {
            warn!(failures = self.inverter.failure_count(), available, "inversion keeps failing, resyncing");
            self.resync()?;
            self.inverter.reset_failures();
            self.diagnostics.failure_count = 0;
        }

        Ok(Step::Adjusted { ingested, recommendation })
    }

    /// Rebalance the dataset and reselect λ from scratch.
    #[instrument(skip(self), fields(available = self.dataset.available()))]
    fn resync(&mut self) -> Result<()> {
        // Recalibration changes the feature space, so the dataset and the
        // model are swapped in together or not at all.
        let mut dataset = self.dataset.clone();
        let target = self.cfg.rebalance_target(dataset.available());
        dataset.rebalance(target, &mut self.rng);
        let fit = trainer::select_regularization(&dataset, self.model.lambda, self.search(), &mut self.rng)?;
        self.dataset = dataset;
        self.commit(fit);
        Ok(())
    }

    fn recommend(&mut self, status: &LiveStatus, target: f64) -> Result<Recommendation> {
        let rec = self.inverter.recommend(&self.model, self.dataset.normalizer(), status, target)?;
        self.interval = rec.interval;
        self.diagnostics.failure_count = self.inverter.failure_count();
        Ok(rec)
    }

    fn commit(&mut self, fit: Fit) {
        self.diagnostics.fitting_error = fit.train_cost;
        self.diagnostics.test_error = fit.test_cost;
        self.diagnostics.lambda = fit.model.lambda;
        self.diagnostics.train_rows = self.dataset.train().len();
        self.diagnostics.test_rows = self.dataset.test().len();
        self.model = fit.model;
    }

    fn search(&self) -> LambdaSearch {
        LambdaSearch {
            trials: self.cfg.lambda_trials,
            trial_iterations: self.cfg.trial_iterations,
            refine_iterations: self.cfg.refine_iterations,
        }
    }

    /// Log an aborted step; the model in effect is unchanged.
    pub fn report(&self, err: &ControllerError) {
        if err.is_invariant_violation() {
            error!(%err, "fit cycle aborted, keeping previous model");
        } else {
            warn!(%err, "controller step skipped");
        }
    }
}
