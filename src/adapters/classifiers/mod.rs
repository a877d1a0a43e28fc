//! Native evaluators for exported classifier artifacts.
//!
//! Each trained estimator is exported as a JSON document tagged by `"kind"`.
//! Parsing and validation happen once at load; evaluation afterwards is pure
//! arithmetic over the stored parameters.

mod boosted;
mod knn;
mod linear;
mod svm;
mod tree;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ports::{Classifier, ModelError};

pub use boosted::{BoostedTrees, RegressionTree};
pub use knn::{KNearestNeighbors, Weights};
pub use linear::LogisticRegression;
pub use svm::{Kernel, SupportVectorClassifier};
pub use tree::{DecisionTree, RandomForest, TreeNodes};

/// Serialized form of every supported classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    #[serde(rename = "xgboost")]
    XgBoost(BoostedTrees),
    Svc(SupportVectorClassifier),
    Knn(KNearestNeighbors),
}

impl ClassifierArtifact {
    /// Validate the parameters and wrap them behind the capability trait.
    ///
    /// # Errors
    /// Returns `ModelError::Malformed` if the artifact fails validation.
    pub fn build(self) -> Result<Arc<dyn Classifier>, ModelError> {
        Ok(match self {
            Self::LogisticRegression(m) => {
                m.validate()?;
                Arc::new(m)
            }
            Self::DecisionTree(m) => {
                m.validate()?;
                Arc::new(m)
            }
            Self::RandomForest(m) => {
                m.validate()?;
                Arc::new(m)
            }
            Self::XgBoost(m) => {
                m.validate()?;
                Arc::new(m)
            }
            Self::Svc(m) => {
                m.validate()?;
                Arc::new(m)
            }
            Self::Knn(m) => {
                m.validate()?;
                Arc::new(m)
            }
        })
    }
}

/// Parse and validate a classifier from JSON bytes.
///
/// # Errors
/// Returns `ModelError::Malformed` for unknown kinds, bad JSON or invalid parameters.
pub fn from_json(bytes: &[u8]) -> Result<Arc<dyn Classifier>, ModelError> {
    let artifact: ClassifierArtifact =
        serde_json::from_slice(bytes).map_err(|e| ModelError::Malformed(e.to_string()))?;
    artifact.build()
}
