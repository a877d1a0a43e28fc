//! Domain layer: Core types and pure logic.
//!
//! This module contains plain Rust types with no I/O. All types are
//! serializable and the derivation formulas live here so that serving and
//! dataset cleaning share them.

pub mod cleaning;
pub mod features;
mod metrics;
mod patient;
mod prediction;
mod scaler;

pub use features::{derive, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use metrics::{
    sample_roc_curve, ConfusionMatrix, DetailedMetrics, FeatureImportance, ModelAccuracies,
    RocPoint, MAX_ROC_POINTS,
};
pub use patient::{RawInput, DAYS_PER_YEAR};
#[cfg(test)]
pub(crate) use patient::sample_input;
pub use prediction::{PredictionResult, RiskLabel};
pub use scaler::{scale, ScalerError, ScalerState};
