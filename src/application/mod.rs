//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod api;
mod inference;
mod metrics;
mod registry;
mod startup;

pub use api::{Api, ApiRequest, ApiResponse};
pub use inference::InferenceService;
pub use metrics::MetricsStore;
pub use registry::{LoadReport, ModelRegistry, Omission, OmittedModel};
pub use startup::{bootstrap, Services, StartupOptions, StartupReport};
