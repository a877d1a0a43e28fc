//! Prediction result types.

use serde::{Deserialize, Serialize};

/// Risk label reported alongside the binary prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    /// Classifier predicted no cardiovascular disease
    Low,
    /// Classifier predicted cardiovascular disease
    High,
}

impl RiskLabel {
    /// Label for a binary prediction: `High` iff the prediction is 1.
    #[must_use]
    pub fn from_prediction(prediction: u8) -> Self {
        if prediction == 1 {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Normalized classifier output returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Binary prediction (0 = no disease, 1 = disease present)
    pub prediction: u8,

    /// Probability of class 1 (0.0 to 1.0)
    pub probability: f64,

    /// `High` iff `prediction == 1`
    pub risk: RiskLabel,
}

impl PredictionResult {
    /// Build a result from a classifier label and class-1 probability.
    ///
    /// The probability is clamped to `[0, 1]`; callers must reject
    /// non-finite values before this point.
    #[must_use]
    pub fn new(prediction: u8, probability: f64) -> Self {
        Self {
            prediction,
            probability: probability.clamp(0.0, 1.0),
            risk: RiskLabel::from_prediction(prediction),
        }
    }
}
