//! Request API: routes protocol requests to the services and maps errors to
//! status codes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::inference::InferenceService;
use super::metrics::MetricsStore;
use crate::adapters::ArtifactError;
use crate::domain::RawInput;
use crate::ports::ArtifactStore;
use crate::CardioError;

const STATUS_MESSAGE: &str = "Cardio Health Predictor API is running";

/// One request line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ApiRequest {
    Status,
    Models,
    Metrics,
    DetailedMetrics,
    Predict(RawInput),
}

/// One response line: a status code and a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn detail(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": detail.into() }),
        }
    }

    fn from_error(err: &CardioError) -> Self {
        match err {
            CardioError::MetricsNotFound(_) => Self {
                status: err.status_code(),
                body: json!({ "error": err.to_string() }),
            },
            _ => Self::detail(err.status_code(), err.to_string()),
        }
    }

    /// Serialize as a single line.
    #[must_use]
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"status\":500,\"body\":{{\"detail\":{}}}}}",
                Value::String(format!("Response serialization failed: {e}"))
            )
        })
    }
}

/// Request handler shared by every transport.
pub struct Api<A: ArtifactStore> {
    inference: Arc<InferenceService>,
    metrics: MetricsStore<A>,
}

impl<A> Api<A>
where
    A: ArtifactStore,
    A::Error: Into<ArtifactError>,
{
    #[must_use]
    pub fn new(inference: Arc<InferenceService>, metrics: MetricsStore<A>) -> Self {
        Self { inference, metrics }
    }

    /// Handle one parsed request.
    pub fn handle(&self, request: ApiRequest) -> ApiResponse {
        match request {
            ApiRequest::Status => ApiResponse::ok(json!({
                "message": STATUS_MESSAGE,
                "models_loaded": self.inference.models_loaded(),
                "scaler_loaded": self.inference.scaler_loaded(),
            })),
            ApiRequest::Models => ApiResponse::ok(json!({
                "models": self.inference.list_models(),
            })),
            ApiRequest::Metrics => Self::respond(self.metrics.get_summary()),
            ApiRequest::DetailedMetrics => Self::respond(self.metrics.get_detailed()),
            ApiRequest::Predict(raw) => {
                if let Err(errors) = raw.validate() {
                    tracing::debug!("Rejected predict request: {} validation errors", errors.len());
                    return ApiResponse::from_error(&CardioError::Validation(errors.join("; ")));
                }
                Self::respond(self.inference.predict(&raw))
            }
        }
    }

    /// Parse and handle one request line, returning the serialized response.
    pub fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<ApiRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::debug!("Malformed request: {e}");
                ApiResponse::detail(422, format!("Malformed request: {e}"))
            }
        };
        response.to_line()
    }

    /// Handle one raw request line; bytes that are not UTF-8 are rejected
    /// as a malformed request.
    pub fn handle_bytes(&self, line: &[u8]) -> String {
        match std::str::from_utf8(line) {
            Ok(text) => self.handle_line(text),
            Err(e) => {
                tracing::debug!("Malformed request: {e}");
                ApiResponse::detail(422, format!("Malformed request: {e}")).to_line()
            }
        }
    }

    fn respond<T: Serialize>(result: crate::Result<T>) -> ApiResponse {
        match result.and_then(|value| serde_json::to_value(value).map_err(CardioError::from)) {
            Ok(body) => ApiResponse::ok(body),
            Err(err) => {
                if err.is_client_error() {
                    tracing::debug!("Request failed: {err}");
                } else {
                    tracing::error!("Request failed: {err}");
                }
                ApiResponse::from_error(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::{ArtifactLayout, FsArtifactStore};
    use crate::adapters::manifest::IntegrityPolicy;
    use crate::application::inference::tests::{service_with, shared, systolic_model};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn api() -> (Api<FsArtifactStore>, TempDir) {
        let temp = tempdir().expect("tempdir");
        let store =
            FsArtifactStore::open(temp.path(), ArtifactLayout::default(), &IntegrityPolicy::default())
                .expect("open");
        let inference = service_with(vec![("Logistic Regression", shared(systolic_model()))]);
        (
            Api::new(Arc::new(inference), MetricsStore::new(Arc::new(store))),
            temp,
        )
    }

    fn call(api: &Api<FsArtifactStore>, line: &str) -> Value {
        serde_json::from_str(&api.handle_line(line)).expect("response is JSON")
    }

    fn predict_line(overrides: Value) -> String {
        let mut request = json!({
            "op": "predict",
            "gender": 1, "age": 50, "height": 165.0, "weight": 70.0,
            "ap_hi": 130, "ap_lo": 85, "cholesterol": 2, "glucose": 1,
            "smoke": 0, "alco": 0, "active": 1,
            "model_name": "Logistic Regression"
        });
        if let (Some(base), Some(extra)) = (request.as_object_mut(), overrides.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        request.to_string()
    }

    #[test]
    fn test_status() {
        let (api, _temp) = api();
        let response = call(&api, r#"{"op": "status"}"#);
        assert_eq!(response["status"], 200);
        assert_eq!(response["body"]["message"], STATUS_MESSAGE);
        assert_eq!(response["body"]["models_loaded"], 1);
        assert_eq!(response["body"]["scaler_loaded"], true);
    }

    #[test]
    fn test_models() {
        let (api, _temp) = api();
        let response = call(&api, r#"{"op": "models"}"#);
        assert_eq!(response["body"]["models"], json!(["Logistic Regression"]));
    }

    #[test]
    fn test_predict() {
        let (api, _temp) = api();
        let response = call(&api, &predict_line(json!({"ap_hi": 160})));
        assert_eq!(response["status"], 200);
        assert_eq!(response["body"]["prediction"], 1);
        assert_eq!(response["body"]["risk"], "High");
    }

    #[test]
    fn test_predict_unknown_model_is_400() {
        let (api, _temp) = api();
        let response = call(&api, &predict_line(json!({"model_name": "Perceptron"})));
        assert_eq!(response["status"], 400);
        let detail = response["body"]["detail"].as_str().expect("detail");
        assert!(detail.contains("Logistic Regression"));
    }

    #[test]
    fn test_predict_validation_is_422() {
        let (api, _temp) = api();
        let response = call(&api, &predict_line(json!({"gender": 5, "ap_lo": 10})));
        assert_eq!(response["status"], 422);
        let detail = response["body"]["detail"].as_str().expect("detail");
        assert!(detail.contains("; "));
    }

    #[test]
    fn test_malformed_requests_are_422() {
        let (api, _temp) = api();
        assert_eq!(call(&api, "not json")["status"], 422);
        assert_eq!(call(&api, r#"{"op": "train"}"#)["status"], 422);
        assert_eq!(call(&api, r#"{"op": "predict", "age": 50}"#)["status"], 422);
    }

    #[test]
    fn test_invalid_utf8_is_422() {
        let (api, _temp) = api();
        let response: Value =
            serde_json::from_str(&api.handle_bytes(b"\xff\xfe bad")).expect("response is JSON");
        assert_eq!(response["status"], 422);
        let detail = response["body"]["detail"].as_str().expect("detail");
        assert!(detail.starts_with("Malformed request"));

        let response: Value =
            serde_json::from_str(&api.handle_bytes(br#"{"op": "status"}"#)).expect("response is JSON");
        assert_eq!(response["status"], 200);
    }

    #[test]
    fn test_metrics_not_found_is_404() {
        let (api, _temp) = api();
        let response = call(&api, r#"{"op": "metrics"}"#);
        assert_eq!(response["status"], 404);
        assert_eq!(response["body"]["error"], "Metrics not found");

        let response = call(&api, r#"{"op": "detailed_metrics"}"#);
        assert_eq!(response["body"]["error"], "Detailed metrics not found");
    }

    #[test]
    fn test_metrics_document_is_returned() {
        let (api, temp) = api();
        fs::write(
            temp.path().join("model_metrics.json"),
            r#"{"XGBoost": 0.73, "KNN": 0.69}"#,
        )
        .expect("write");
        let response = call(&api, r#"{"op": "metrics"}"#);
        assert_eq!(response["status"], 200);
        assert_eq!(response["body"]["XGBoost"], 0.73);
    }

    #[test]
    fn test_scaler_unavailable_is_500() {
        let temp = tempdir().expect("tempdir");
        let store =
            FsArtifactStore::open(temp.path(), ArtifactLayout::default(), &IntegrityPolicy::default())
                .expect("open");
        let inference = InferenceService::new(None, Arc::new(Default::default()));
        let api = Api::new(Arc::new(inference), MetricsStore::new(Arc::new(store)));

        let response = call(&api, &predict_line(json!({})));
        assert_eq!(response["status"], 500);
        assert_eq!(response["body"]["detail"], "Scaler not loaded");
    }
}
