//! Classifier port: Capability trait for trained binary classifiers.
//!
//! Every model variant (linear, tree ensembles, kernel machines, neighbour
//! voting) is evaluated behind this one interface. Callers never need to know
//! which concrete estimator they hold.

/// Errors raised while evaluating a classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Input contains a non-finite value at position {index}")]
    NonFiniteInput { index: usize },

    #[error("Model produced a non-finite output")]
    NonFiniteOutput,

    #[error("Malformed model: {0}")]
    Malformed(String),
}

/// Trait for a trained binary classifier.
///
/// Implementations are immutable after load and shared across requests.
pub trait Classifier: Send + Sync {
    /// Short name of the estimator family (e.g. `"random_forest"`).
    fn kind(&self) -> &'static str;

    /// Number of input features the model was trained on.
    fn n_features(&self) -> usize;

    /// Predict the class label (0 or 1) for one scaled feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` on a length mismatch and
    /// `ModelError::NonFiniteInput` if any value is NaN or infinite.
    fn predict(&self, x: &[f64]) -> Result<u8, ModelError>;

    /// Probability of class 1, when the model supports it.
    ///
    /// # Returns
    /// `None` if the estimator has no probability capability.
    ///
    /// # Errors
    /// Same as [`Classifier::predict`].
    fn predict_proba(&self, _x: &[f64]) -> Result<Option<f64>, ModelError> {
        Ok(None)
    }
}

/// Shared input check for classifier implementations.
///
/// # Errors
/// Returns `FeatureCount` or `NonFiniteInput`.
pub fn check_input(x: &[f64], expected: usize) -> Result<(), ModelError> {
    if x.len() != expected {
        return Err(ModelError::FeatureCount {
            expected,
            actual: x.len(),
        });
    }
    match x.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ModelError::NonFiniteInput { index }),
        None => Ok(()),
    }
}
