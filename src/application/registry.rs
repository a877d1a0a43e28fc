//! Model registry: logical model name to loaded classifier.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::ports::{ArtifactStore, Classifier};
use crate::{CardioError, Result};

/// Why a configured model did not make it into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Omission {
    /// No artifact at the configured location
    Missing,
    /// The artifact exists but could not be read, parsed or verified
    Failed { error: String },
    /// The artifact was trained on a different feature count
    FeatureCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OmittedModel {
    pub name: String,
    pub location: String,
    #[serde(flatten)]
    pub omission: Omission,
}

/// Outcome of populating the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub omitted: Vec<OmittedModel>,
}

impl LoadReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.omitted.is_empty()
    }
}

/// Immutable set of loaded classifiers, shared across requests.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<dyn Classifier>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}

impl FromIterator<(String, Arc<dyn Classifier>)> for ModelRegistry {
    fn from_iter<I: IntoIterator<Item = (String, Arc<dyn Classifier>)>>(iter: I) -> Self {
        Self {
            models: iter.into_iter().collect(),
        }
    }
}

impl ModelRegistry {
    /// Populate the registry from `{logical name -> artifact location}`.
    ///
    /// Artifacts that are missing, fail to load, or expect a feature count
    /// other than `expected_features` are left out and listed in the report.
    pub fn load<A: ArtifactStore>(
        store: &A,
        entries: &BTreeMap<String, String>,
        expected_features: usize,
    ) -> (Self, LoadReport) {
        let mut models = BTreeMap::new();
        let mut report = LoadReport::default();

        for (name, location) in entries {
            let omission = match store.load_model(location) {
                Ok(Some(model)) if model.n_features() == expected_features => {
                    tracing::info!("Loaded model {name} ({})", model.kind());
                    models.insert(name.clone(), model);
                    report.loaded.push(name.clone());
                    continue;
                }
                Ok(Some(model)) => Omission::FeatureCount {
                    expected: expected_features,
                    found: model.n_features(),
                },
                Ok(None) => Omission::Missing,
                Err(e) => Omission::Failed {
                    error: e.to_string(),
                },
            };
            tracing::warn!("Model {name} omitted ({location}): {omission:?}");
            report.omitted.push(OmittedModel {
                name: name.clone(),
                location: location.clone(),
                omission,
            });
        }

        (Self { models }, report)
    }

    /// Loaded model names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Look up a model by its logical name.
    ///
    /// # Errors
    /// Returns `CardioError::UnknownModel` listing the available names.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Classifier>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| CardioError::UnknownModel {
                name: name.to_string(),
                available: self.names(),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
