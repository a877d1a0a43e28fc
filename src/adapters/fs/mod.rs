//! Filesystem adapter: Implementation of ArtifactStore over a local directory.
//!
//! Reads the scaler, classifier artifacts and metrics documents produced by
//! the training run. Absent files are reported as `None`; files that exist
//! but are unreadable, malformed or fail verification are errors.
//!
//! # Integrity
//!
//! The manifest is verified once when the store is opened. Every later read
//! is checked against it again, so a file swapped after startup is refused.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::classifiers;
use super::manifest::{self, IntegrityPolicy, Manifest};
use crate::domain::{DetailedMetrics, ModelAccuracies, ScalerState};
use crate::ports::{ArtifactStore, Classifier};

/// Error type for artifact operations.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid artifact {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("Integrity check failed: {0}")]
    Integrity(String),
}

/// File names of the shared artifacts, relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    pub scaler: String,
    pub summary_metrics: String,
    pub detailed_metrics: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            scaler: "standard_scaler.json".into(),
            summary_metrics: "model_metrics.json".into(),
            detailed_metrics: "detailed_metrics.json".into(),
        }
    }
}

/// Artifact store rooted at a local directory.
#[derive(Debug)]
pub struct FsArtifactStore {
    root: PathBuf,
    layout: ArtifactLayout,
    manifest: Option<Manifest>,
}

impl FsArtifactStore {
    /// Open a store, verifying the directory's manifest under `policy`.
    ///
    /// # Errors
    /// Returns `ArtifactError::Integrity` if verification fails.
    pub fn open(
        root: impl Into<PathBuf>,
        layout: ArtifactLayout,
        policy: &IntegrityPolicy,
    ) -> Result<Self, ArtifactError> {
        let root = root.into();
        let manifest = manifest::verify_dir(&root, policy)?;
        tracing::info!(
            "Opened artifact directory {:?} (manifest: {})",
            root,
            if manifest.is_some() { "verified" } else { "absent" }
        );
        Ok(Self {
            root,
            layout,
            manifest,
        })
    }

    /// Whether a manifest was found and verified at open.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.manifest.is_some()
    }

    fn read(&self, rel: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        if !manifest::is_contained(rel) {
            return Err(ArtifactError::Integrity(format!(
                "Path {rel} escapes the artifact directory"
            )));
        }
        let path = self.root.join(rel);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Artifact {rel} not found");
                return Ok(None);
            }
            Err(source) => return Err(ArtifactError::Io { path, source }),
        };
        if let Some(manifest) = &self.manifest {
            manifest.check(rel, &bytes)?;
        }
        Ok(Some(bytes))
    }

    fn read_json<T: DeserializeOwned>(&self, rel: &str) -> Result<Option<T>, ArtifactError> {
        let Some(bytes) = self.read(rel)? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ArtifactError::Parse {
                path: rel.to_string(),
                message: e.to_string(),
            })
    }
}

impl ArtifactStore for FsArtifactStore {
    type Error = ArtifactError;

    fn load_scaler(&self) -> Result<Option<ScalerState>, Self::Error> {
        let rel = &self.layout.scaler;
        let Some(state) = self.read_json::<ScalerState>(rel)? else {
            return Ok(None);
        };
        state.validate().map_err(|e| ArtifactError::Invalid {
            path: rel.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(state))
    }

    fn load_model(&self, location: &str) -> Result<Option<Arc<dyn Classifier>>, Self::Error> {
        let Some(bytes) = self.read(location)? else {
            return Ok(None);
        };
        let model = classifiers::from_json(&bytes).map_err(|e| ArtifactError::Invalid {
            path: location.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(
            "Loaded {} model from {location} ({} features)",
            model.kind(),
            model.n_features()
        );
        Ok(Some(model))
    }

    fn load_summary_metrics(&self) -> Result<Option<ModelAccuracies>, Self::Error> {
        self.read_json(&self.layout.summary_metrics)
    }

    fn load_detailed_metrics(&self) -> Result<Option<DetailedMetrics>, Self::Error> {
        self.read_json(&self.layout.detailed_metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::manifest::{write_manifest, Manifest};
    use std::fs;
    use tempfile::tempdir;

    fn open(dir: &Path) -> FsArtifactStore {
        FsArtifactStore::open(dir, ArtifactLayout::default(), &IntegrityPolicy::default())
            .expect("open store")
    }

    #[test]
    fn test_absent_artifacts_are_none() {
        let temp = tempdir().expect("tempdir");
        let store = open(temp.path());
        assert!(!store.is_verified());
        assert!(store.load_scaler().expect("scaler").is_none());
        assert!(store.load_model("models/knn_model.json").expect("model").is_none());
        assert!(store.load_summary_metrics().expect("summary").is_none());
        assert!(store.load_detailed_metrics().expect("detailed").is_none());
    }

    #[test]
    fn test_loads_scaler_and_model() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(
            dir.join("standard_scaler.json"),
            r#"{"mean_": [1.0, 2.0], "scale_": [1.0, 0.5]}"#,
        )
        .expect("write scaler");
        fs::create_dir_all(dir.join("models")).expect("mkdir");
        fs::write(
            dir.join("models/lr.json"),
            r#"{"kind": "logistic_regression", "coefficients": [1.0, 0.0], "intercept": 0.0}"#,
        )
        .expect("write model");

        let store = open(dir);
        let scaler = store.load_scaler().expect("scaler").expect("present");
        assert_eq!(scaler.n_features(), 2);
        let model = store.load_model("models/lr.json").expect("model").expect("present");
        assert_eq!(model.kind(), "logistic_regression");
    }

    #[test]
    fn test_invalid_scaler_is_an_error() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("standard_scaler.json"),
            r#"{"mean": [1.0], "scale": [0.0]}"#,
        )
        .expect("write scaler");
        let err = open(temp.path()).load_scaler().expect_err("must fail");
        assert!(matches!(err, ArtifactError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_metrics_is_parse_error() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("model_metrics.json"), "not json").expect("write");
        let err = open(temp.path()).load_summary_metrics().expect_err("must fail");
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_unbound_file_is_refused_when_manifest_present() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("model_metrics.json"), r#"{"KNN": 0.69}"#).expect("write");
        fs::write(dir.join("detailed_metrics.json"), "{}").expect("write");
        let manifest = Manifest::build(dir, ["model_metrics.json"]).expect("build");
        write_manifest(dir, &manifest, None).expect("write manifest");

        let store = open(dir);
        assert!(store.is_verified());
        let summary = store.load_summary_metrics().expect("bound").expect("present");
        assert_eq!(summary.get("KNN"), Some(0.69));

        let err = store.load_detailed_metrics().expect_err("unbound");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }

    #[test]
    fn test_rejects_escaping_location() {
        let temp = tempdir().expect("tempdir");
        let err = open(temp.path())
            .load_model("../outside.json")
            .err()
            .expect("must fail");
        assert!(matches!(err, ArtifactError::Integrity(_)));
    }
}
