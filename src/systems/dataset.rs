//! Bounded train/test dataset.
//!
//! Both sets are always expressed under the dataset's current
//! [`Normalizer`]. Samples are never dropped: a rebalance folds the test set
//! back into training, recalibrates, then moves random rows out to the test
//! set until training is back at its target size.

use bevy_prng::WyRand;
use tracing::{debug, warn};

use crate::mechanics::{Matrix, stoch};
use crate::systems::normalizer::{Normalizer, Recalibration};
use crate::systems::sample::{FEATURE_COUNT, Sample};

#[derive(Clone, Debug)]
pub struct Dataset {
    train: Vec<Sample>,
    test: Vec<Sample>,
    /// Training design matrix, grown row by row between rebalances.
    x: Matrix,
    /// Training targets, same row order as `x`.
    y: Matrix,
    normalizer: Normalizer,
    rebalance_every: usize,
    train_cap: usize,
}

/// Outcome of one rebalance.
#[derive(Clone, Debug, PartialEq)]
pub struct Rebalance {
    pub target: usize,
    pub train: usize,
    pub test: usize,
    pub recalibration: Recalibration,
}

impl Dataset {
    pub fn new(rebalance_every: usize, train_cap: usize) -> Self {
        Self {
            train: Vec::with_capacity(train_cap),
            test: Vec::new(),
            x: Matrix::with_capacity(FEATURE_COUNT, train_cap),
            y: Matrix::with_capacity(1, train_cap),
            normalizer: Normalizer::default(),
            rebalance_every: rebalance_every.max(1),
            train_cap,
        }
    }

    pub fn train(&self) -> &[Sample] {
        &self.train
    }

    pub fn test(&self) -> &[Sample] {
        &self.test
    }

    /// Training features, one row per sample.
    pub fn x(&self) -> &Matrix {
        &self.x
    }

    /// Training costs as a column.
    pub fn y(&self) -> &Matrix {
        &self.y
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Rows held in train and test together.
    pub fn available(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Normalize a raw sample and append it to training.
    ///
    /// Returns `true` when the caller should rebalance: the total crossed a
    /// multiple of the rebalance period, or training outgrew its cap.
    /// Samples with a non-finite cost or feature are dropped and never stored.
    pub fn ingest(&mut self, raw: &Sample) -> bool {
        if !raw.is_finite() {
            warn!(cost = raw.cost, "non-finite sample dropped");
            return false;
        }
        let before = self.available() / self.rebalance_every;
        let row = self.normalizer.normalize(raw);

        // x is FEATURE_COUNT wide and y is one wide.
        let appended = self.x.append_row(&row.features).and(self.y.append_row(&[row.cost]));
        debug_assert!(appended.is_ok(), "training matrices lost their shape");
        self.train.push(row);

        let after = self.available() / self.rebalance_every;
        after != before || self.train.len() > self.train_cap
    }

    /// Merge test into train, recalibrate, then move uniformly random rows
    /// to test until training holds `min(available, target)` rows.
    pub fn rebalance(&mut self, target: usize, rng: &mut WyRand) -> Rebalance {
        self.train.append(&mut self.test);
        let recalibration = self.normalizer.recompute(&mut self.train);

        while self.train.len() > target {
            let i = stoch::index(rng, self.train.len());
            self.test.push(self.train.swap_remove(i));
        }
        self.rebuild();

        debug!(
            target,
            train = self.train.len(),
            test = self.test.len(),
            degenerate = recalibration.degenerate.len(),
            "dataset rebalanced"
        );
        Rebalance { target, train: self.train.len(), test: self.test.len(), recalibration }
    }

    fn rebuild(&mut self) {
        self.x = Matrix::features(&self.train);
        self.y = Matrix::costs(&self.train);
    }
}
