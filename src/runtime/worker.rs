//! The controller thread.
//!
//! Runs [`ControllerState::step`] in a loop until cancelled. Errors abort
//! only the step that raised them. The cancel flag is checked before and
//! after every sleep, and between steps.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::runtime::handle::{ControllerHandle, Shared};
use crate::runtime::state::{ControllerState, Phase, Step};
use crate::systems::sample::Sample;

/// Owns the controller thread; dropping it cancels and joins.
#[derive(Debug)]
pub struct ControllerWorker {
    handle: ControllerHandle,
    join: Option<JoinHandle<ControllerState>>,
}

/// Start a controller on its own thread.
pub fn spawn(cfg: ControllerConfig) -> std::io::Result<(ControllerHandle, ControllerWorker)> {
    let state = ControllerState::new(cfg);
    let (handle, rx) = ControllerHandle::new(state.interval(), state.config().default_target_cost, state.diagnostics());
    let shared = Arc::clone(handle.shared());

    let join = thread::Builder::new()
        .name("spawn-controller".into())
        .spawn(move || run(state, &shared, &rx))?;

    Ok((handle.clone(), ControllerWorker { handle, join: Some(join) }))
}

fn run(mut state: ControllerState, shared: &Shared, rx: &Receiver<Sample>) -> ControllerState {
    info!("controller started");
    let cancelled = || shared.cancelled.load(std::sync::atomic::Ordering::Acquire);

    while !cancelled() {
        let drained: Vec<Sample> = rx.try_iter().collect();
        let status = *shared.status.lock();
        let target = shared.target_cost.load();

        let idle = drained.is_empty();
        match state.step(drained, &status, target) {
            Ok(Step::Gathering { queued }) => debug!(queued, "gathering"),
            Ok(_) => {}
            Err(e) => state.report(&e),
        }
        shared.interval.store(state.interval());
        *shared.diagnostics.lock() = state.diagnostics();

        let pause = match state.phase() {
            Phase::AwaitingBootstrap => state.config().idle_sleep,
            Phase::Trained if idle => state.config().pace_sleep,
            Phase::Trained => continue,
        };
        if cancelled() {
            break;
        }
        if !pause.is_zero() {
            thread::sleep(pause);
        }
    }

    info!(phase = ?state.phase(), "controller stopped");
    state
}

impl ControllerWorker {
    pub fn handle(&self) -> &ControllerHandle {
        &self.handle
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel and wait for the thread. Returns the final state, or `None`
    /// if the thread panicked or was already joined.
    pub fn shutdown(mut self) -> Option<ControllerState> {
        self.stop()
    }

    fn stop(&mut self) -> Option<ControllerState> {
        self.handle.cancel();
        self.join.take().and_then(|j| j.join().ok())
    }
}

impl Drop for ControllerWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
