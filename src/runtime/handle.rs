//! Cross-thread surface between the simulation and the controller.
//!
//! The simulation only ever touches a [`ControllerHandle`]: samples go in
//! through an unbounded channel, the live status through a single-slot
//! mailbox, and the recommended interval comes back as an atomic scalar.
//! The dataset and model never leave the controller thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::warn;

use crate::runtime::state::Diagnostics;
use crate::systems::inverter::LiveStatus;
use crate::systems::sample::Sample;

/// `f64` stored as bits in an `AtomicU64`.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Release);
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) interval: AtomicF64,
    pub(crate) target_cost: AtomicF64,
    pub(crate) status: Mutex<LiveStatus>,
    pub(crate) diagnostics: Mutex<Diagnostics>,
    pub(crate) cancelled: AtomicBool,
}

/// Cheap to clone; every clone talks to the same controller.
#[derive(Clone, Debug)]
pub struct ControllerHandle {
    shared: Arc<Shared>,
    samples: Sender<Sample>,
}

impl ControllerHandle {
    pub(crate) fn new(interval: f64, target_cost: f64, diagnostics: Diagnostics) -> (Self, Receiver<Sample>) {
        let (samples, rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Shared {
            interval: AtomicF64::new(interval),
            target_cost: AtomicF64::new(target_cost),
            status: Mutex::new(LiveStatus::default()),
            diagnostics: Mutex::new(diagnostics),
            cancelled: AtomicBool::new(false),
        });
        (Self { shared, samples }, rx)
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Hand one telemetry window to the controller. Never blocks.
    pub fn push_sample(&self, sample: Sample) {
        match self.samples.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Disconnected(_)) => warn!("controller stopped, sample dropped"),
            Err(TrySendError::Full(_)) => warn!("sample queue full, sample dropped"),
        }
    }

    /// Replace the live status the next recommendation is computed from.
    pub fn publish_status(&self, status: LiveStatus) {
        *self.shared.status.lock() = status;
    }

    /// Runtime-adjustable cost target.
    pub fn set_target_cost(&self, value: f64) {
        if value.is_finite() {
            self.shared.target_cost.store(value);
        }
    }

    pub fn target_cost(&self) -> f64 {
        self.shared.target_cost.load()
    }

    /// Seconds between spawns, always inside the configured bounds.
    pub fn recommended_interval(&self) -> f64 {
        self.shared.interval.load()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut d = *self.shared.diagnostics.lock();
        d.queued = self.queued_samples();
        d
    }

    /// Samples sent but not yet drained by the controller.
    pub fn queued_samples(&self) -> usize {
        self.samples.len()
    }

    /// Ask the controller to stop at its next safe point.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}
