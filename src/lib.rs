//! # cardiorisk
//!
//! Cardiovascular disease risk inference over trained classifier artifacts.
//!
//! This crate provides:
//! - Feature derivation from raw clinical inputs into a named, fixed-order schema
//! - Standardization with a scaler fitted at training time
//! - Native evaluation of exported classifiers behind one capability trait
//! - Read access to precomputed evaluation metrics
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (RawInput, FeatureVector, ScalerState, PredictionResult, metrics)
//! - `ports`: Trait definitions at the seams (Classifier, ArtifactStore)
//! - `adapters`: Concrete implementations (classifier evaluators, filesystem store,
//!   manifest verification, stdio transport, log sanitization, CSV datasets)
//! - `application`: Use cases (registry, inference, metrics, startup, request API)
//! - `config`: TOML configuration with environment overrides

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{FeatureVector, PredictionResult, RawInput, RiskLabel, ScalerState};

/// Result type for cardiorisk operations
pub type Result<T> = std::result::Result<T, CardioError>;

/// Main error type for cardiorisk
#[derive(Debug, thiserror::Error)]
pub enum CardioError {
    #[error("Feature vector has {actual} values but the scaler expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model {name} not found. Available models: {available:?}")]
    UnknownModel { name: String, available: Vec<String> },

    #[error("Scaler not loaded")]
    ScalerUnavailable,

    #[error("Inference failed: {0}")]
    Inference(#[source] ports::ModelError),

    #[error("{0} not found")]
    MetricsNotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Feature schema error: {0}")]
    Schema(domain::ScalerError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CardioError {
    /// Status code reported to callers of the request API.
    ///
    /// Mirrors HTTP semantics: client mistakes are 4xx, configuration and
    /// artifact problems are 5xx.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownModel { .. } => 400,
            Self::MetricsNotFound(_) => 404,
            Self::Validation(_) => 422,
            Self::DimensionMismatch { .. }
            | Self::ScalerUnavailable
            | Self::Inference(_)
            | Self::Schema(_)
            | Self::Artifact(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Serialization(_) => 500,
        }
    }

    /// Whether the failure was caused by the request rather than the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<domain::ScalerError> for CardioError {
    fn from(err: domain::ScalerError) -> Self {
        match err {
            domain::ScalerError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            other => Self::Schema(other),
        }
    }
}

impl From<ports::ModelError> for CardioError {
    fn from(err: ports::ModelError) -> Self {
        Self::Inference(err)
    }
}
