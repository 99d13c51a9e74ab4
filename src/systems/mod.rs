pub mod dataset;
pub mod inverter;
pub mod normalizer;
pub mod sample;
pub mod trainer;

pub use dataset::{Dataset, Rebalance};
pub use inverter::{InversionLimits, LiveStatus, RateInverter, Recommendation};
pub use normalizer::{Normalizer, Recalibration};
pub use sample::{FEATURE_COUNT, Feature, Sample, TelemetryWindow, UnitStats};
pub use trainer::{Fit, LambdaSearch, Model};
