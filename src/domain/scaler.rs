//! Standardization with a scaler fitted at training time.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// Errors raised by scaler validation and application.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScalerError {
    #[error("Feature vector has {actual} values but the scaler expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Scaler was fitted on {found} features, schema has {expected}")]
    FeatureCount { expected: usize, found: usize },

    #[error("Feature {position} is {found:?} in the scaler but {expected:?} in the schema")]
    SchemaMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid scaler state: {0}")]
    Invalid(String),
}

/// Per-feature mean and scale, immutable after load.
///
/// Accepts scikit-learn `StandardScaler` attribute names as aliases so an
/// export can dump the fitted attributes verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    /// Column names seen during fitting, when the exporter recorded them
    #[serde(default, alias = "feature_names_in_")]
    pub feature_names: Option<Vec<String>>,

    #[serde(alias = "mean_")]
    pub mean: Vec<f64>,

    /// Standard deviation per feature (1.0 for constant columns)
    #[serde(alias = "scale_")]
    pub scale: Vec<f64>,
}

impl ScalerState {
    /// Create a scaler state without recorded feature names.
    ///
    /// # Errors
    /// Returns `ScalerError::Invalid` if the state is inconsistent.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalerError> {
        let state = Self {
            feature_names: None,
            mean,
            scale,
        };
        state.validate()?;
        Ok(state)
    }

    /// Attach the fitted column names.
    ///
    /// # Errors
    /// Returns `ScalerError::Invalid` if the name count differs from the mean length.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, ScalerError> {
        self.feature_names = Some(names);
        self.validate()?;
        Ok(self)
    }

    /// Number of features the scaler was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns `ScalerError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<(), ScalerError> {
        let n = self.mean.len();
        if n == 0 {
            return Err(ScalerError::Invalid("scaler has no features".into()));
        }
        if self.scale.len() != n {
            return Err(ScalerError::Invalid(format!(
                "mean has {n} entries but scale has {}",
                self.scale.len()
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != n {
                return Err(ScalerError::Invalid(format!(
                    "mean has {n} entries but feature_names has {}",
                    names.len()
                )));
            }
        }
        if let Some(i) = self.mean.iter().position(|m| !m.is_finite()) {
            return Err(ScalerError::Invalid(format!("mean[{i}] is not finite")));
        }
        if let Some(i) = self
            .scale
            .iter()
            .position(|s| !s.is_finite() || *s == 0.0)
        {
            return Err(ScalerError::Invalid(format!(
                "scale[{i}] must be finite and non-zero"
            )));
        }
        Ok(())
    }

    /// Check the scaler against a feature schema.
    ///
    /// The count must always match; names are compared only when the scaler
    /// recorded them.
    ///
    /// # Errors
    /// Returns `FeatureCount` or `SchemaMismatch`.
    pub fn ensure_schema(&self, schema: &[&str]) -> Result<(), ScalerError> {
        if self.n_features() != schema.len() {
            return Err(ScalerError::FeatureCount {
                expected: schema.len(),
                found: self.n_features(),
            });
        }
        if let Some(names) = &self.feature_names {
            for (position, (found, expected)) in names.iter().zip(schema).enumerate() {
                if found != expected {
                    return Err(ScalerError::SchemaMismatch {
                        position,
                        expected: (*expected).to_string(),
                        found: found.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Standardize a feature vector: `(v[i] - mean[i]) / scale[i]`.
///
/// # Errors
/// Returns `ScalerError::DimensionMismatch` if the vector length differs
/// from the scaler's.
pub fn scale(v: &FeatureVector, state: &ScalerState) -> Result<FeatureVector, ScalerError> {
    if v.len() != state.n_features() {
        return Err(ScalerError::DimensionMismatch {
            expected: state.n_features(),
            actual: v.len(),
        });
    }

    let scaled = v
        .as_slice()
        .iter()
        .zip(state.mean.iter().zip(&state.scale))
        .map(|(x, (mean, std))| (x - mean) / std)
        .collect::<Vec<_>>();

    Ok(FeatureVector::new(scaled))
}
