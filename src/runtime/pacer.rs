//! Simulation-side consumer of the recommended interval.
//!
//! The shared interval eases toward the recommendation by `dt` each tick,
//! so a jumpy controller never whipsaws the spawn rate. Each spawner keeps
//! its own countdown and re-arms from the shared interval when it fires.

use crate::mechanics::control;

#[derive(Clone, Debug)]
pub struct SpawnPacer {
    general: f64,
    bounds: (f64, f64),
    countdowns: Vec<f64>,
}

impl SpawnPacer {
    /// `spawners` countdowns, all armed at `initial` seconds.
    pub fn new(spawners: usize, initial: f64, bounds: (f64, f64)) -> Self {
        let general = initial.clamp(bounds.0, bounds.1);
        Self { general, bounds, countdowns: vec![general; spawners] }
    }

    /// Current shared interval, seconds.
    pub fn interval(&self) -> f64 {
        self.general
    }

    pub fn spawners(&self) -> usize {
        self.countdowns.len()
    }

    /// Units per second across every spawner.
    pub fn spawn_rate(&self) -> f64 {
        control::spawn_rate(self.spawners(), self.general)
    }

    /// Advance by `dt` seconds. Returns the indices of spawners that fire.
    pub fn advance(&mut self, dt: f64, recommended: f64) -> Vec<usize> {
        let (lo, hi) = self.bounds;
        self.general = control::approach(self.general, recommended.clamp(lo, hi), dt.clamp(0.0, 1.0), lo, hi);

        let mut fired = Vec::new();
        for (i, t) in self.countdowns.iter_mut().enumerate() {
            *t -= dt;
            if *t <= 0.0 {
                *t = self.general;
                fired.push(i);
            }
        }
        fired
    }
}
