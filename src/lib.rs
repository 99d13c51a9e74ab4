/*!
`spawn_balance` — an adaptive spawn-rate controller for agent simulations.

What it does
- Learns, online, how per-tick processing cost depends on population size
  and live unit statistics (regularized linear regression over 11 features).
- Inverts that model to find the population that would cost a configured
  budget per tick, and turns the gap into a spawn interval in [0.01, 1.0] s.
- Runs on its own thread next to the simulation and never blocks it:
  samples go in through an unbounded queue, the interval comes back as an
  atomic scalar.

How to use (call surface only)
- `runtime::spawn(ControllerConfig::default())` → `(ControllerHandle, ControllerWorker)`.
- Simulation side, per tick:
  * fold unit stats into a `systems::TelemetryWindow`; when it yields a
    `Sample`, call `handle.push_sample(sample)`;
  * `handle.publish_status(LiveStatus { snapshot, spawners })`;
  * read `handle.recommended_interval()` (or drive a `runtime::SpawnPacer`).
- `handle.set_target_cost(ms)` at any time; `handle.diagnostics()` for display.
- `worker.shutdown()` cancels cooperatively and joins.

For deterministic, single-threaded use drive `runtime::ControllerState::step`
directly.

What it does NOT do
- No general ML: one fixed, linear-in-features model.
- No global optimum guarantee: training only ever keeps the best point it
  has evaluated.
- No persistence across restarts.
*/

pub mod config;
pub mod error;
pub mod mechanics;
pub mod runtime;
pub mod systems;

pub use config::ControllerConfig;
pub use error::{ControllerError, Result};
