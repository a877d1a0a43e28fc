//! Adapters layer: Concrete implementations of ports and I/O edges.
//!
//! - `classifiers`: native evaluators for exported model artifacts
//! - `fs`: artifact directory store
//! - `manifest`: SHA-256 manifest and Ed25519 signature verification
//! - `sanitize`: redaction for log output
//! - `stdio`: line-delimited JSON transport
//! - `dataset`: CSV reading and writing for dataset cleaning

pub mod classifiers;
pub mod dataset;
pub mod fs;
pub mod manifest;
pub mod sanitize;
pub mod stdio;

// Re-export artifact error for lib.rs
pub use fs::ArtifactError;
