// demos/headless.rs
// Run with:
//   RUST_LOG=spawn_balance=debug cargo run --example headless
//
// A synthetic arena with no renderer: units spawn from a few spawners, live
// for a random number of ticks, and every tick "costs" an amount that grows
// with population. The controller steers the spawn interval so the per-tick
// cost settles near the target.

use std::thread;
use std::time::Duration;

use spawn_balance::ControllerConfig;
use spawn_balance::mechanics::stoch;
use spawn_balance::runtime::{self, SpawnPacer};
use spawn_balance::systems::{LiveStatus, TelemetryWindow, UnitStats};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TICKS: usize = 8_000;
const DT: f64 = 0.05;
const SPAWNERS: usize = 4;
const TARGET_MS: f64 = 2.5;

struct Unit {
    stats: UnitStats,
    ticks_left: usize,
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = ControllerConfig { window_ticks: 20, ..ControllerConfig::default() };
    let (lo, hi) = cfg.interval_bounds;
    let mut window = TelemetryWindow::new(cfg.window_ticks);
    let mut pacer = SpawnPacer::new(SPAWNERS, cfg.initial_interval, (lo, hi));

    let (handle, worker) = runtime::spawn(cfg)?;
    handle.set_target_cost(TARGET_MS);

    let mut rng = stoch::seeded(0xa11ce);
    let mut units: Vec<Unit> = Vec::new();

    for tick in 0..TICKS {
        for _ in pacer.advance(DT, handle.recommended_interval()) {
            units.push(Unit {
                stats: UnitStats {
                    hit_points: 80.0 + 40.0 * stoch::unit(&mut rng),
                    damage: 5.0 + 10.0 * stoch::unit(&mut rng),
                    speed: 2.0 + stoch::unit(&mut rng),
                    range: if stoch::unit(&mut rng) < 0.3 { 12.0 } else { 1.5 },
                },
                ticks_left: stoch::range(&mut rng, 200, 1_200),
            });
        }
        units.retain_mut(|u| {
            u.ticks_left = u.ticks_left.saturating_sub(1);
            u.ticks_left > 0
        });

        // Pairwise-ish work: linear plus a quadratic term, plus jitter.
        let n = units.len() as f64;
        let ranged = units.iter().filter(|u| u.stats.range > 10.0).count() as f64;
        let cost_ms = 0.01 * n + 0.0004 * n * n + 0.002 * ranged * n / 10.0 + 0.2 * stoch::unit(&mut rng);

        let stats: Vec<UnitStats> = units.iter().map(|u| u.stats).collect();
        if let Some(sample) = window.record_tick(&stats, cost_ms) {
            handle.push_sample(sample);
        }
        handle.publish_status(LiveStatus { snapshot: *window.latest(), spawners: SPAWNERS });

        if tick % 500 == 0 {
            println!(
                "tick {tick:>5}  units {:>4}  cost {cost_ms:>6.2} ms  interval {:.3}s  rate {:>6.2}/s",
                units.len(),
                pacer.interval(),
                pacer.spawn_rate(),
            );
            println!("{}", handle.diagnostics());
        }
        thread::sleep(Duration::from_micros(250));
    }

    let state = worker.shutdown();
    println!("== Headless run finished ==");
    if let Some(state) = state {
        println!("phase     -> {:?}", state.phase());
        println!("samples   -> {}", state.dataset().available());
        println!("model θ   -> {:?}", state.model().theta().as_slice());
        println!("λ         -> {:.3}", state.model().lambda);
    }
    Ok(())
}
