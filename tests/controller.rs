// tests/controller.rs
use spawn_balance::ControllerConfig;
use spawn_balance::runtime::{ControllerState, Diagnostics, Phase, SpawnPacer, Step};
use spawn_balance::systems::{Feature, LiveStatus, Sample, TelemetryWindow, UnitStats};

fn samples(range: std::ops::Range<usize>) -> Vec<Sample> {
    range
        .map(|i| {
            let p = i as f64;
            Sample::population(p, 0.01 * p).with(Feature::HitPointsMean, 40.0 + (i % 3) as f64)
        })
        .collect()
}

fn live(population: f64) -> LiveStatus {
    LiveStatus { snapshot: Sample::population(population, 0.0), spawners: 2 }
}

fn in_bounds(interval: f64) -> bool {
    (0.01..=1.0).contains(&interval)
}

/* ──────────────────────────────────────────────────────────────────────────
1) Bootstrap gating: nothing is trained before 25 samples, then exactly once
────────────────────────────────────────────────────────────────────────── */

#[test]
fn gathers_until_bootstrap_then_trains_once() {
    let mut s = ControllerState::new(ControllerConfig::deterministic(7));
    assert_eq!(s.phase(), Phase::AwaitingBootstrap);
    assert_eq!(s.interval(), 0.3);

    let step = s.step(samples(0..10), &live(5.0), 0.2).unwrap();
    assert_eq!(step, Step::Gathering { queued: 10 });
    assert!(step.recommendation().is_none());
    assert_eq!(s.diagnostics().bootstrap_progress, -0.4);
    assert_eq!(s.dataset().available(), 0);
    assert_eq!(s.diagnostics().fitting_error, 0.0);

    let step = s.step(samples(10..24), &live(5.0), 0.2).unwrap();
    assert_eq!(step, Step::Gathering { queued: 24 });
    assert_eq!(s.phase(), Phase::AwaitingBootstrap);

    let step = s.step(samples(24..25), &live(5.0), 0.2).unwrap();
    assert!(matches!(step, Step::Bootstrapped(_)));
    assert_eq!(s.phase(), Phase::Trained);
    assert_eq!(s.diagnostics().bootstrap_progress, -1.0);
    assert_eq!(s.dataset().train().len(), 25);
    assert!(s.dataset().test().is_empty());
    assert!(s.diagnostics().fitting_error > 0.0);
    assert_eq!(s.diagnostics().test_error, 0.0);
    assert!(s.model().coefficient(Feature::Population) > 0.0);
    assert!(in_bounds(s.interval()));

    // Trained from here on; empty steps only re-recommend.
    let step = s.step(Vec::new(), &live(5.0), 0.2).unwrap();
    assert!(matches!(step, Step::Adjusted { ingested: 0, .. }));
    assert_eq!(s.phase(), Phase::Trained);
    assert_eq!(s.diagnostics().bootstrap_progress, -1.0);
}

#[test]
fn a_large_first_batch_is_ingested_whole() {
    let mut s = ControllerState::new(ControllerConfig::deterministic(1));
    let step = s.step(samples(0..60), &live(10.0), 0.3).unwrap();
    assert!(matches!(step, Step::Bootstrapped(_)));
    assert_eq!(s.dataset().available(), 60);
    assert_eq!(s.dataset().train().len(), 25);
    assert_eq!(s.dataset().test().len(), 35);
}

/* ──────────────────────────────────────────────────────────────────────────
2) Steady state: samples are conserved, training stays capped
────────────────────────────────────────────────────────────────────────── */

#[test]
fn steady_state_conserves_samples_and_caps_training() {
    let mut s = ControllerState::new(ControllerConfig::deterministic(11));
    s.step(samples(0..25), &live(5.0), 0.5).unwrap();

    let mut fed = 25;
    for batch in 0..40 {
        let n = 3 + batch % 7;
        let step = s.step(samples(fed..fed + n), &live(fed as f64 / 2.0), 0.5).unwrap();
        fed += n;

        assert!(matches!(step, Step::Adjusted { ingested, .. } if ingested == n));
        assert_eq!(s.dataset().available(), fed);
        assert!(s.dataset().train().len() <= 200 + n);
        assert!(in_bounds(s.interval()));
        assert!(s.diagnostics().fitting_error.is_finite());
    }
    assert!(fed > 200);
    assert!(!s.dataset().test().is_empty());
}

#[test]
fn reproducible_with_a_fixed_seed() {
    let run = |seed| {
        let mut s = ControllerState::new(ControllerConfig::deterministic(seed));
        s.step(samples(0..40), &live(8.0), 0.25).unwrap();
        s.step(samples(40..55), &live(8.0), 0.25).unwrap();
        (s.model().clone(), s.interval())
    };
    assert_eq!(run(5), run(5));
}

/* ──────────────────────────────────────────────────────────────────────────
3) Circuit breaker: persistent inversion failures force a resync
────────────────────────────────────────────────────────────────────────── */

#[test]
fn persistent_failures_force_a_resync() {
    let mut s = ControllerState::new(ControllerConfig::deterministic(2));
    // Unreachable target: every inversion falls back.
    let target = 1.0e9;
    s.step(samples(0..60), &live(10.0), target).unwrap();
    assert_eq!(s.failure_count(), 1);
    assert_eq!(s.interval(), 1.0);

    let mut peak = 0;
    let mut reset_seen = false;
    for _ in 0..120 {
        s.step(Vec::new(), &live(10.0), target).unwrap();
        peak = peak.max(s.failure_count());
        reset_seen |= s.failure_count() == 0;
        assert_eq!(s.interval(), 1.0);
    }
    assert!(reset_seen);
    assert!(peak <= 100);
    assert_eq!(s.diagnostics().failure_count, s.failure_count());
}

#[test]
fn small_datasets_never_force_a_resync() {
    let mut s = ControllerState::new(ControllerConfig::deterministic(2));
    s.step(samples(0..30), &live(10.0), 1.0e9).unwrap();
    for _ in 0..110 {
        s.step(Vec::new(), &live(10.0), 1.0e9).unwrap();
    }
    assert_eq!(s.failure_count(), 111);
}

/* ──────────────────────────────────────────────────────────────────────────
4) Bad data and aborted cycles stay inside the controller
────────────────────────────────────────────────────────────────────────── */

#[test]
fn a_non_finite_sample_never_reaches_diagnostics() {
    let mut s = ControllerState::new(ControllerConfig::deterministic(13));
    // Bad rows do not count toward bootstrap.
    let mut first = samples(0..24);
    first.push(Sample::population(3.0, f64::NAN));
    assert_eq!(s.step(first, &live(5.0), 0.5).unwrap(), Step::Gathering { queued: 24 });
    s.step(samples(24..25), &live(5.0), 0.5).unwrap();
    assert_eq!(s.phase(), Phase::Trained);

    s.step(vec![Sample::population(30.0, f64::NAN)], &live(5.0), 0.5).unwrap();
    assert_eq!(s.dataset().available(), 25);
    assert_eq!(s.diagnostics().rejected, 2);

    for batch in 0..60 {
        let lo = 25 + batch * 5;
        s.step(samples(lo..lo + 5), &live(lo as f64 / 2.0), 0.5).unwrap();
        let d = s.diagnostics();
        assert!(d.fitting_error.is_finite(), "batch {batch}: {d:?}");
        assert!(d.test_error.is_finite(), "batch {batch}: {d:?}");
        assert!(d.lambda.is_finite());
        assert!(in_bounds(s.interval()));
    }
    assert_eq!(s.dataset().available(), 325);
    assert!(s.dataset().train().iter().chain(s.dataset().test()).all(Sample::is_finite));
}

#[test]
fn an_aborted_cycle_keeps_the_previous_model() {
    // A zero-sample bootstrap tries to fit an empty dataset and fails.
    let cfg = ControllerConfig { bootstrap_samples: 0, ..ControllerConfig::deterministic(3) };
    let mut s = ControllerState::new(cfg);
    let before = s.model().clone();

    let err = s.step(Vec::new(), &live(5.0), 0.5).unwrap_err();
    assert!(!err.is_invariant_violation());
    s.report(&err);
    assert_eq!(s.phase(), Phase::AwaitingBootstrap);
    assert_eq!(s.model(), &before);
    assert!(s.dataset().is_empty());
    assert_eq!(s.interval(), 0.3);
    assert_eq!(s.diagnostics().fitting_error, 0.0);

    // Rebalancing to zero rows leaves nothing to fit, so data does not help;
    // each attempt is abandoned without touching the committed state.
    assert!(s.step(samples(0..25), &live(5.0), 0.5).is_err());
    assert_eq!(s.model(), &before);
    assert!(s.dataset().is_empty());
    assert_eq!(s.phase(), Phase::AwaitingBootstrap);
}

/* ──────────────────────────────────────────────────────────────────────────
5) Diagnostics text
────────────────────────────────────────────────────────────────────────── */

#[test]
fn diagnostics_render_for_display() {
    let gathering = Diagnostics { bootstrap_progress: -0.4, ..Diagnostics::default() };
    assert_eq!(gathering.to_string(), "Gathering data... 40%");

    let no_test = Diagnostics { fitting_error: 0.0125, bootstrap_progress: -1.0, ..Diagnostics::default() };
    assert_eq!(no_test.to_string(), "Fitting error: 0.0125\nNo test set currently");

    let full = Diagnostics { fitting_error: 0.5, test_error: 0.75, ..Diagnostics::default() };
    assert_eq!(full.to_string(), "Fitting error: 0.5000\nTest error: 0.7500");
}

/* ──────────────────────────────────────────────────────────────────────────
6) Simulation side: telemetry windows and the spawn pacer
────────────────────────────────────────────────────────────────────────── */

#[test]
fn telemetry_window_averages_ticks() {
    let units = [
        UnitStats { hit_points: 10.0, damage: 2.0, speed: 1.0, range: 5.0 },
        UnitStats { hit_points: 20.0, damage: 2.0, speed: 3.0, range: 5.0 },
    ];
    let mut w = TelemetryWindow::new(3);
    assert!(w.record_tick(&units, 4.0).is_none());
    assert!(w.record_tick(&units[..1], 6.0).is_none());
    assert_eq!(w.ticks_in_window(), 2);
    assert_eq!(w.latest().get(Feature::Population), 1.0);

    let s = w.record_tick(&units, 8.0).expect("window closes on the third tick");
    assert_eq!(w.ticks_in_window(), 0);
    assert_eq!(s.cost, 6.0);
    assert_eq!(s.get(Feature::Bias), 1.0);
    assert!((s.get(Feature::Population) - 5.0 / 3.0).abs() < 1e-12);
    assert!((s.get(Feature::PopulationSquared) - 9.0 / 3.0).abs() < 1e-12);
    // 15 ± 5 twice, 10 ± 0 once
    assert!((s.get(Feature::HitPointsMean) - 40.0 / 3.0).abs() < 1e-12);
    assert!((s.get(Feature::HitPointsStdDev) - 10.0 / 3.0).abs() < 1e-12);
    assert_eq!(s.get(Feature::DamageStdDev), 0.0);
}

#[test]
fn empty_tick_has_zero_stats() {
    let mut w = TelemetryWindow::new(1);
    let s = w.record_tick(std::iter::empty(), 1.5).unwrap();
    assert_eq!(s.get(Feature::Population), 0.0);
    assert_eq!(s.get(Feature::SpeedMean), 0.0);
    assert_eq!(s.cost, 1.5);
}

#[test]
fn pacer_fires_each_spawner_on_its_countdown() {
    let mut p = SpawnPacer::new(2, 0.5, (0.01, 1.0));
    assert_eq!(p.spawn_rate(), 4.0);
    assert!(p.advance(0.25, 0.5).is_empty());
    assert_eq!(p.advance(0.25, 0.5), vec![0, 1]);
    assert!(p.advance(0.25, 0.5).is_empty());
}

#[test]
fn pacer_eases_toward_the_recommendation() {
    let mut p = SpawnPacer::new(1, 1.0, (0.01, 1.0));
    let mut last = p.interval();
    for _ in 0..50 {
        p.advance(0.1, 0.01);
        assert!(p.interval() < last);
        assert!(p.interval() >= 0.01);
        last = p.interval();
    }
    assert!(p.interval() < 0.02);

    // Out-of-range recommendations are clamped first.
    p.advance(1.0, 50.0);
    assert!((p.interval() - 1.0).abs() < 1e-12);
}
