// tests/dataset.rs
use spawn_balance::ControllerConfig;
use spawn_balance::mechanics::stoch;
use spawn_balance::systems::{Dataset, Feature, Sample};

fn sample(i: usize) -> Sample {
    let p = i as f64;
    Sample::population(p, 0.02 * p + 0.5).with(Feature::DamageMean, 2.0 + (i % 5) as f64)
}

fn filled(n: usize) -> Dataset {
    let mut d = Dataset::new(25, 200);
    for i in 0..n {
        d.ingest(&sample(i));
    }
    d
}

/* ──────────────────────────────────────────────────────────────────────────
1) Ingest signals when a rebalance is due
────────────────────────────────────────────────────────────────────────── */

#[test]
fn ingest_flags_every_twenty_fifth_row() {
    let mut d = Dataset::new(25, 200);
    let flagged: Vec<usize> = (0..100).filter(|&i| d.ingest(&sample(i))).map(|i| i + 1).collect();
    assert_eq!(flagged, vec![25, 50, 75, 100]);
    assert_eq!(d.train().len(), 100);
    assert_eq!(d.x().rows(), 100);
    assert_eq!(d.y().rows(), 100);
}

#[test]
fn ingest_flags_when_train_outgrows_cap() {
    let mut d = Dataset::new(1000, 10);
    let flags: Vec<bool> = (0..12).map(|i| d.ingest(&sample(i))).collect();
    assert!(!flags[9]);
    assert!(flags[10] && flags[11]);
}

/* ──────────────────────────────────────────────────────────────────────────
2) Rebalance conserves rows and hits its target
────────────────────────────────────────────────────────────────────────── */

#[test]
fn rebalance_conserves_and_sizes_train() {
    let cfg = ControllerConfig::default();
    let mut rng = stoch::seeded(7);
    let mut d = filled(100);

    for (extra, seed_rows) in [(0usize, 0usize), (30, 100), (120, 130)] {
        for i in 0..extra {
            d.ingest(&sample(seed_rows + i));
        }
        let before = d.available();
        let target = cfg.rebalance_target(before);
        let r = d.rebalance(target, &mut rng);

        assert_eq!(d.available(), before, "rows lost");
        assert_eq!(r.train + r.test, before);
        assert_eq!(d.train().len(), before.min(target));
        assert_eq!(d.x().rows(), d.train().len());
        assert_eq!(d.y().rows(), d.train().len());
    }
}

#[test]
fn rebalance_target_policy() {
    let cfg = ControllerConfig::default();
    assert_eq!(cfg.rebalance_target(250), 150);
    assert_eq!(cfg.rebalance_target(200), 150);
    assert_eq!(cfg.rebalance_target(100), 75);
    assert_eq!(cfg.rebalance_target(25), 18);
}

#[test]
fn bootstrap_rebalance_keeps_everything_in_train() {
    let mut rng = stoch::seeded(1);
    let mut d = filled(25);
    let r = d.rebalance(25, &mut rng);
    assert_eq!(r.train, 25);
    assert_eq!(r.test, 0);
    assert!(d.test().is_empty());
}

#[test]
fn rows_share_one_normalization() {
    let mut rng = stoch::seeded(3);
    let mut d = filled(80);
    d.rebalance(60, &mut rng);

    // Every stored row, train or test, sits inside the recalibrated range.
    for r in d.train().iter().chain(d.test()) {
        let p = r.get(Feature::Population);
        assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&p), "population {p}");
        assert_eq!(r.get(Feature::Bias), 1.0);
    }
    // And a fresh raw sample lands where the stored copy of the same sample is.
    let raw = sample(40);
    let fresh = d.normalizer().normalize(&raw);
    let stored = d
        .train()
        .iter()
        .chain(d.test())
        .find(|r| (r.cost - raw.cost).abs() < 1e-12)
        .expect("sample 40 is somewhere");
    assert!((stored.get(Feature::Population) - fresh.get(Feature::Population)).abs() < 1e-9);
}

#[test]
fn rebalance_moves_rows_at_random() {
    let a = {
        let mut d = filled(100);
        d.rebalance(75, &mut stoch::seeded(11));
        d.test().iter().map(|r| r.cost).collect::<Vec<_>>()
    };
    let b = {
        let mut d = filled(100);
        d.rebalance(75, &mut stoch::seeded(12));
        d.test().iter().map(|r| r.cost).collect::<Vec<_>>()
    };
    assert_eq!(a.len(), 25);
    assert_eq!(b.len(), 25);
    assert_ne!(a, b, "different seeds should pick different rows");
}

/* ──────────────────────────────────────────────────────────────────────────
3) Non-finite samples never enter the dataset
────────────────────────────────────────────────────────────────────────── */

#[test]
fn non_finite_samples_are_dropped_on_ingest() {
    let mut d = filled(24);
    assert!(!d.ingest(&sample(24).with_cost(f64::NAN)));
    assert!(!d.ingest(&sample(24).with(Feature::DamageMean, f64::INFINITY)));
    assert_eq!(d.available(), 24);
    assert_eq!(d.x().rows(), 24);
    assert_eq!(d.y().rows(), 24);

    // The next clean row still lands on the rebalance boundary.
    assert!(d.ingest(&sample(24)));
    d.rebalance(18, &mut stoch::seeded(5));
    assert!(d.train().iter().chain(d.test()).all(Sample::is_finite));
}
