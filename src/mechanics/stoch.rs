//! Stochastic mechanics: uniform draws on `bevy_prng::WyRand`.
//! The controller owns its RNG outright, so helpers take `&mut WyRand`.

use bevy_prng::WyRand;
use rand_core::{RngCore, SeedableRng};

/// WyRand from a `u64` seed.
#[inline]
pub fn seeded(seed: u64) -> WyRand {
    WyRand::from_seed(seed.to_le_bytes())
}

/// Uniform in [0, 1) from the top 53 bits.
#[inline]
pub fn unit(rng: &mut WyRand) -> f64 {
    ((rng.next_u64() >> 11) as f64) / ((1u64 << 53) as f64)
}

/// Uniform index in [0, n). `n` must be non-zero.
#[inline]
pub fn index(rng: &mut WyRand, n: usize) -> usize {
    debug_assert!(n > 0);
    ((unit(rng) * n as f64) as usize).min(n - 1)
}

/// Uniform integer in [lo, hi); `lo` when the range is empty.
#[inline]
pub fn range(rng: &mut WyRand, lo: usize, hi: usize) -> usize {
    if hi <= lo { lo } else { lo + index(rng, hi - lo) }
}
