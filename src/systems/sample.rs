//! Telemetry samples: the unit of data the simulation hands the controller.
//!
//! A [`Sample`] is a fixed-length feature vector plus the processing cost
//! observed over the window that produced it. [`TelemetryWindow`] lives on
//! the simulation side and folds per-tick unit statistics into one sample
//! every `window` ticks.

/// Number of features in every sample.
pub const FEATURE_COUNT: usize = 11;

/// Feature columns, in storage order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(usize)]
pub enum Feature {
    /// Constant 1; carries the intercept and is never normalized or penalized.
    Bias = 0,
    Population = 1,
    PopulationSquared = 2,
    HitPointsMean = 3,
    HitPointsStdDev = 4,
    DamageMean = 5,
    DamageStdDev = 6,
    SpeedMean = 7,
    SpeedStdDev = 8,
    RangeMean = 9,
    RangeStdDev = 10,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Bias,
        Feature::Population,
        Feature::PopulationSquared,
        Feature::HitPointsMean,
        Feature::HitPointsStdDev,
        Feature::DamageMean,
        Feature::DamageStdDev,
        Feature::SpeedMean,
        Feature::SpeedStdDev,
        Feature::RangeMean,
        Feature::RangeStdDev,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Feature> {
        Self::ALL.get(i).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::Bias => "bias",
            Feature::Population => "population",
            Feature::PopulationSquared => "population_sq",
            Feature::HitPointsMean => "hp_mean",
            Feature::HitPointsStdDev => "hp_std",
            Feature::DamageMean => "dmg_mean",
            Feature::DamageStdDev => "dmg_std",
            Feature::SpeedMean => "speed_mean",
            Feature::SpeedStdDev => "speed_std",
            Feature::RangeMean => "range_mean",
            Feature::RangeStdDev => "range_std",
        }
    }
}

/// One telemetry observation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub features: [f64; FEATURE_COUNT],
    /// Observed processing time per tick for the window.
    pub cost: f64,
}

impl Default for Sample {
    fn default() -> Self {
        let mut features = [0.0; FEATURE_COUNT];
        features[Feature::Bias.index()] = 1.0;
        Self { features, cost: 0.0 }
    }
}

impl Sample {
    /// Bias set, everything else zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample for a bare population count; stat features stay zero.
    pub fn population(count: f64, cost: f64) -> Self {
        Self::new()
            .with(Feature::Population, count)
            .with(Feature::PopulationSquared, count * count)
            .with_cost(cost)
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    #[inline]
    pub fn get(&self, feature: Feature) -> f64 {
        self.features[feature.index()]
    }

    /// Every feature and the cost are finite.
    pub fn is_finite(&self) -> bool {
        self.cost.is_finite() && self.features.iter().all(|v| v.is_finite())
    }

    /// The bias column is pinned to 1.
    #[inline]
    pub fn set(&mut self, feature: Feature, value: f64) {
        if feature != Feature::Bias {
            self.features[feature.index()] = value;
        }
    }
}

/// Per-unit combat stats the simulation reports each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UnitStats {
    pub hit_points: f64,
    pub damage: f64,
    pub speed: f64,
    pub range: f64,
}

impl UnitStats {
    fn values(&self) -> [f64; 4] {
        [self.hit_points, self.damage, self.speed, self.range]
    }
}

const STAT_COLUMNS: [(Feature, Feature); 4] = [
    (Feature::HitPointsMean, Feature::HitPointsStdDev),
    (Feature::DamageMean, Feature::DamageStdDev),
    (Feature::SpeedMean, Feature::SpeedStdDev),
    (Feature::RangeMean, Feature::RangeStdDev),
];

/// Instantaneous snapshot of one tick: population plus mean and population
/// standard deviation of each stat. Stats stay zero when nobody is alive.
pub fn snapshot<'a>(units: impl IntoIterator<Item = &'a UnitStats>) -> Sample {
    let units: Vec<[f64; 4]> = units.into_iter().map(UnitStats::values).collect();
    let n = units.len() as f64;
    let mut s = Sample::population(n, 0.0);
    if units.is_empty() {
        return s;
    }

    for (k, (mean_f, std_f)) in STAT_COLUMNS.iter().enumerate() {
        let mean = units.iter().map(|u| u[k]).sum::<f64>() / n;
        let var = units.iter().map(|u| (u[k] - mean).powi(2)).sum::<f64>() / n;
        s.set(*mean_f, mean);
        s.set(*std_f, var.sqrt());
    }
    s
}

/// Accumulates tick snapshots and yields their average every `window` ticks.
#[derive(Clone, Debug)]
pub struct TelemetryWindow {
    window: usize,
    ticks: usize,
    sums: Sample,
    latest: Sample,
}

impl TelemetryWindow {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            ticks: 0,
            sums: Self::zeroed(),
            latest: Sample::new(),
        }
    }

    fn zeroed() -> Sample {
        Sample { features: [0.0; FEATURE_COUNT], cost: 0.0 }
    }

    /// Fold in one tick. Returns the averaged sample when the window closes.
    pub fn record_tick<'a>(
        &mut self,
        units: impl IntoIterator<Item = &'a UnitStats>,
        processing_ms: f64,
    ) -> Option<Sample> {
        let snap = snapshot(units);
        for (acc, v) in self.sums.features.iter_mut().zip(snap.features.iter()) {
            *acc += v;
        }
        self.sums.cost += processing_ms;
        self.latest = snap;
        self.ticks += 1;

        if self.ticks < self.window {
            return None;
        }
        let n = self.ticks as f64;
        let mut out = Sample::new().with_cost(self.sums.cost / n);
        for f in Feature::ALL.iter().skip(1) {
            out.set(*f, self.sums.get(*f) / n);
        }
        self.ticks = 0;
        self.sums = Self::zeroed();
        Some(out)
    }

    /// Snapshot of the most recent tick.
    pub fn latest(&self) -> &Sample {
        &self.latest
    }

    pub fn ticks_in_window(&self) -> usize {
        self.ticks
    }
}
