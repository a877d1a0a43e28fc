//! Metrics store: read accessor over the training-time evaluation documents.

use std::sync::Arc;

use crate::adapters::ArtifactError;
use crate::domain::{DetailedMetrics, ModelAccuracies};
use crate::ports::ArtifactStore;
use crate::{CardioError, Result};

/// Serves the summary and detailed metrics documents.
///
/// Every call reads through the store, so documents written by a later
/// training run are picked up without a restart.
pub struct MetricsStore<A: ArtifactStore> {
    store: Arc<A>,
}

impl<A: ArtifactStore> Clone for MetricsStore<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<A> MetricsStore<A>
where
    A: ArtifactStore,
    A::Error: Into<ArtifactError>,
{
    #[must_use]
    pub fn new(store: Arc<A>) -> Self {
        Self { store }
    }

    /// Per-model test accuracy.
    ///
    /// # Errors
    /// Returns `MetricsNotFound` if the document is absent, or an artifact
    /// error if it cannot be read.
    pub fn get_summary(&self) -> Result<ModelAccuracies> {
        self.store
            .load_summary_metrics()
            .map_err(|e| CardioError::Artifact(e.into()))?
            .ok_or_else(|| CardioError::MetricsNotFound("Metrics".into()))
    }

    /// Detailed evaluation, with the ROC curve sampled to at most 20 points
    /// and feature importances sorted descending.
    ///
    /// # Errors
    /// Returns `MetricsNotFound` if the document is absent, or an artifact
    /// error if it cannot be read.
    pub fn get_detailed(&self) -> Result<DetailedMetrics> {
        self.store
            .load_detailed_metrics()
            .map_err(|e| CardioError::Artifact(e.into()))?
            .map(DetailedMetrics::normalized)
            .ok_or_else(|| CardioError::MetricsNotFound("Detailed metrics".into()))
    }
}
