//! Feature derivation: raw clinical inputs to the model's feature vector.
//!
//! The vector layout is a named schema, not an implicit positional
//! convention. The scaler records the column names it was fitted on and is
//! checked against [`FEATURE_NAMES`] when artifacts are loaded.

use serde::{Deserialize, Serialize};

use super::patient::RawInput;

/// Number of slots in the canonical feature schema.
pub const FEATURE_COUNT: usize = 16;

/// Canonical feature schema: training column names in fitted order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "height",
    "weight",
    "ap_hi",
    "ap_lo",
    "cholesterol",
    "gluc",
    "smoke",
    "alco",
    "active",
    "age_years",
    "height_m",
    "bmi",
    "MAP",
    "Pulse_Pressure",
];

/// Ordered feature values handed to the scaler and classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Look up a slot by its canonical schema name.
    ///
    /// Returns `None` for unknown names or vectors shorter than the schema.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<f64> {
        let position = FEATURE_NAMES.iter().position(|n| *n == name)?;
        self.0.get(position).copied()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Height in metres from centimetres.
#[must_use]
pub fn height_m(height_cm: f64) -> f64 {
    height_cm / 100.0
}

/// Body mass index: weight over height squared.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let h = height_m(height_cm);
    weight_kg / (h * h)
}

/// Mean arterial pressure, weighting diastolic twice.
#[must_use]
pub fn mean_arterial_pressure(ap_hi: f64, ap_lo: f64) -> f64 {
    (2.0 * ap_lo + ap_hi) / 3.0
}

/// Systolic minus diastolic.
#[must_use]
pub fn pulse_pressure(ap_hi: f64, ap_lo: f64) -> f64 {
    ap_hi - ap_lo
}

/// Build the canonical feature vector for one request.
///
/// Total: malformed inputs (e.g. zero height) yield non-finite slots, which
/// classifiers reject downstream. Range checks belong to
/// [`RawInput::validate`].
#[must_use]
pub fn derive(raw: &RawInput) -> FeatureVector {
    let ap_hi = f64::from(raw.ap_hi);
    let ap_lo = f64::from(raw.ap_lo);

    FeatureVector(vec![
        raw.age_days(),
        f64::from(raw.gender),
        raw.height,
        raw.weight,
        ap_hi,
        ap_lo,
        f64::from(raw.cholesterol),
        f64::from(raw.glucose),
        f64::from(raw.smoke),
        f64::from(raw.alco),
        f64::from(raw.active),
        f64::from(raw.age),
        height_m(raw.height),
        bmi(raw.weight, raw.height),
        mean_arterial_pressure(ap_hi, ap_lo),
        pulse_pressure(ap_hi, ap_lo),
    ])
}
