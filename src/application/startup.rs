//! Startup: load artifacts once and report what is available.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::inference::InferenceService;
use super::metrics::MetricsStore;
use super::registry::{LoadReport, ModelRegistry};
use crate::adapters::ArtifactError;
use crate::domain::{FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::ArtifactStore;
use crate::{CardioError, Result};

/// What to load and how strictly.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Fail startup on any omitted artifact instead of serving what loaded
    pub strict: bool,
    /// Logical model name to artifact location
    pub models: BTreeMap<String, String>,
}

/// Health report produced once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub started_at: DateTime<Utc>,
    pub scaler_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaler_error: Option<String>,
    pub models: LoadReport,
    pub summary_metrics: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_metrics_error: Option<String>,
    pub detailed_metrics: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detailed_metrics_error: Option<String>,
}

impl StartupReport {
    /// Whether the scaler and every configured model loaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.scaler_loaded && self.models.is_complete()
    }

    /// One line per missing or failed artifact.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.scaler_loaded {
            problems.push(match &self.scaler_error {
                Some(e) => format!("scaler: {e}"),
                None => "scaler: missing".to_string(),
            });
        }
        for omitted in &self.models.omitted {
            problems.push(format!(
                "model {} ({}): {:?}",
                omitted.name, omitted.location, omitted.omission
            ));
        }
        if !self.summary_metrics {
            problems.push(absent("summary metrics", self.summary_metrics_error.as_deref()));
        }
        if !self.detailed_metrics {
            problems.push(absent("detailed metrics", self.detailed_metrics_error.as_deref()));
        }
        problems
    }
}

fn absent(what: &str, error: Option<&str>) -> String {
    match error {
        Some(e) => format!("{what}: {e}"),
        None => format!("{what}: missing"),
    }
}

/// Split a metrics read into presence and, for anything but absence, the error text.
fn metrics_status<T>(result: Result<T>) -> (Option<T>, Option<String>) {
    match result {
        Ok(doc) => (Some(doc), None),
        Err(CardioError::MetricsNotFound(_)) => (None, None),
        Err(e) => (None, Some(e.to_string())),
    }
}

/// Everything the request layer needs, built once.
pub struct Services<A: ArtifactStore> {
    pub inference: Arc<InferenceService>,
    pub metrics: MetricsStore<A>,
    pub report: StartupReport,
}

/// Load the scaler and the configured models, then check the metrics documents.
///
/// Missing artifacts are tolerated and reported unless `options.strict`
/// is set. Metrics are only checked here: they are read again on every request.
///
/// # Errors
/// - `Schema` if the scaler disagrees with the canonical feature schema
/// - `Config` in strict mode when the scaler or any model was omitted
pub fn bootstrap<A>(store: Arc<A>, options: &StartupOptions) -> Result<Services<A>>
where
    A: ArtifactStore,
    A::Error: Into<ArtifactError>,
{
    let started_at = Utc::now();

    let (scaler, scaler_error) = match store.load_scaler() {
        Ok(Some(state)) => {
            state.ensure_schema(&FEATURE_NAMES).map_err(CardioError::Schema)?;
            tracing::info!("Loaded scaler ({} features)", state.n_features());
            (Some(Arc::new(state)), None)
        }
        Ok(None) => {
            tracing::warn!("Scaler artifact not found");
            (None, None)
        }
        Err(e) => {
            let err: ArtifactError = e.into();
            tracing::warn!("Scaler failed to load: {err}");
            (None, Some(err.to_string()))
        }
    };

    let (registry, models) = ModelRegistry::load(store.as_ref(), &options.models, FEATURE_COUNT);

    let metrics = MetricsStore::new(Arc::clone(&store));
    let (summary, summary_metrics_error) = metrics_status(metrics.get_summary());
    if let Some((best, accuracy)) = summary.as_ref().and_then(|s| s.ranked().first().copied()) {
        tracing::info!("Best evaluated model: {best} (accuracy {accuracy:.4})");
    }
    let (detailed, detailed_metrics_error) = metrics_status(metrics.get_detailed());
    if let Some(detailed) = &detailed {
        tracing::info!(
            "Detailed metrics over {} test samples",
            detailed.confusion_matrix.total()
        );
    }

    let report = StartupReport {
        started_at,
        scaler_loaded: scaler.is_some(),
        scaler_error,
        models,
        summary_metrics: summary.is_some(),
        summary_metrics_error,
        detailed_metrics: detailed.is_some(),
        detailed_metrics_error,
    };

    for problem in report.problems() {
        tracing::warn!("Startup: {problem}");
    }
    if options.strict && !report.is_complete() {
        return Err(CardioError::Config(format!(
            "strict startup: {}",
            report.problems().join("; ")
        )));
    }

    tracing::info!(
        models = registry.len(),
        scaler = report.scaler_loaded,
        "Startup complete"
    );

    Ok(Services {
        inference: Arc::new(InferenceService::new(scaler, Arc::new(registry))),
        metrics,
        report,
    })
}
