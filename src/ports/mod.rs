//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (trained classifier
//! artifacts, the artifact directory).

mod artifacts;
mod classifier;

pub use artifacts::ArtifactStore;
pub use classifier::{check_input, Classifier, ModelError};
