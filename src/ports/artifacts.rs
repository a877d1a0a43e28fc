//! Artifact store port: Trait for loading trained artifacts.
//!
//! This trait abstracts where the scaler, models and metrics documents live
//! (a local directory today) from the application logic.

use std::sync::Arc;

use crate::domain::{DetailedMetrics, ModelAccuracies, ScalerState};

use super::Classifier;

/// Trait for read-only access to training artifacts.
///
/// Every loader returns `Ok(None)` when the artifact is simply absent, so the
/// caller decides whether absence is tolerable.
pub trait ArtifactStore: Send + Sync {
    /// Error type for artifact operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the fitted scaler.
    ///
    /// # Errors
    /// Returns error if the scaler exists but cannot be read, parsed or verified.
    fn load_scaler(&self) -> Result<Option<ScalerState>, Self::Error>;

    /// Load one classifier from a location relative to the store root.
    ///
    /// # Errors
    /// Returns error if the artifact exists but cannot be read, parsed or verified.
    fn load_model(&self, location: &str) -> Result<Option<Arc<dyn Classifier>>, Self::Error>;

    /// Load the per-model accuracy summary.
    ///
    /// # Errors
    /// Returns error if the document exists but cannot be read or parsed.
    fn load_summary_metrics(&self) -> Result<Option<ModelAccuracies>, Self::Error>;

    /// Load the detailed evaluation of the reference model.
    ///
    /// # Errors
    /// Returns error if the document exists but cannot be read or parsed.
    fn load_detailed_metrics(&self) -> Result<Option<DetailedMetrics>, Self::Error>;
}
