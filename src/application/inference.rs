//! Inference service: Orchestrates risk prediction for one patient.
//!
//! This service coordinates:
//! - Feature derivation from raw inputs
//! - Standardization with the fitted scaler
//! - Model lookup and evaluation
//! - Normalization of the classifier output

use std::sync::Arc;

use super::registry::ModelRegistry;
use crate::domain::{derive, scale, PredictionResult, RawInput, ScalerState};
use crate::ports::ModelError;
use crate::{CardioError, Result};

/// Service for running cardiovascular risk inference.
///
/// Holds only immutable, shared state; safe to call from many threads.
#[derive(Debug, Clone)]
pub struct InferenceService {
    scaler: Option<Arc<ScalerState>>,
    registry: Arc<ModelRegistry>,
}

impl InferenceService {
    /// Create a new inference service.
    ///
    /// A missing scaler is tolerated here and reported per request.
    #[must_use]
    pub fn new(scaler: Option<Arc<ScalerState>>, registry: Arc<ModelRegistry>) -> Self {
        Self { scaler, registry }
    }

    /// Run the prediction pipeline for one request.
    ///
    /// # Errors
    /// - `ScalerUnavailable` if no scaler was loaded
    /// - `DimensionMismatch` if the scaler disagrees with the feature schema
    /// - `UnknownModel` if `raw.model_name` is not loaded
    /// - `Inference` if the classifier rejects the input or produces a non-finite output
    pub fn predict(&self, raw: &RawInput) -> Result<PredictionResult> {
        tracing::debug!("Step 1: Deriving features");
        let features = derive(raw);

        tracing::debug!("Step 2: Scaling features");
        let scaler = self.scaler.as_deref().ok_or(CardioError::ScalerUnavailable)?;
        let scaled = scale(&features, scaler)?;

        tracing::debug!("Step 3: Resolving model");
        let model = self.registry.get(&raw.model_name)?;

        tracing::debug!("Step 4: Evaluating {} model", model.kind());
        let label = model.predict(scaled.as_slice())?;
        let probability = model
            .predict_proba(scaled.as_slice())?
            .unwrap_or_else(|| f64::from(label));
        if !probability.is_finite() {
            return Err(ModelError::NonFiniteOutput.into());
        }

        let result = PredictionResult::new(label, probability);
        tracing::info!(
            model = %raw.model_name,
            risk = %result.risk,
            "Prediction complete"
        );
        Ok(result)
    }

    /// Names of the loaded models, sorted.
    #[must_use]
    pub fn list_models(&self) -> Vec<String> {
        self.registry.names()
    }

    #[must_use]
    pub fn scaler_loaded(&self) -> bool {
        self.scaler.is_some()
    }

    #[must_use]
    pub fn models_loaded(&self) -> usize {
        self.registry.len()
    }

    /// Whether at least one prediction path is fully available.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.scaler_loaded() && !self.registry.is_empty()
    }
}
