//! Control mechanics: proportional smoothing and spawn-interval shaping.

/// Proportional approach: x' = clamp(x + k * (target - x)).
#[inline]
pub fn approach(x: f64, target: f64, k: f64, lo: f64, hi: f64) -> f64 {
    (x + k * (target - x)).clamp(lo, hi)
}

/// Seconds between spawns so `spawners` spawners add `delta` units in about
/// one second. Clamped to [lo, hi]; `fallback` when no growth is needed.
#[inline]
pub fn spawn_interval(spawners: usize, delta: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if delta > 0.0 && delta.is_finite() {
        let interval = spawners as f64 / delta;
        if interval.is_nan() { fallback } else { interval.clamp(lo, hi) }
    } else {
        fallback
    }
}

/// Spawn rate in units per second for a shared interval.
#[inline]
pub fn spawn_rate(spawners: usize, interval: f64) -> f64 {
    if interval > 0.0 { spawners as f64 / interval } else { 0.0 }
}
