// src/runtime/mod.rs

// Orchestration around the systems. `state` and `pacer` are plain
// single-threaded types; the threaded controller needs the `runtime` feature.

pub mod pacer;
pub mod state;
pub use pacer::SpawnPacer;
pub use state::{ControllerState, Diagnostics, Phase, Step};

#[cfg(feature = "runtime")]
pub mod handle;
#[cfg(feature = "runtime")]
pub mod worker;

#[cfg(feature = "runtime")]
pub use handle::ControllerHandle;
#[cfg(feature = "runtime")]
pub use worker::{ControllerWorker, spawn};
