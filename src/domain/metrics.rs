//! Evaluation metrics produced once at training time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maximum number of ROC points served to the presentation layer.
pub const MAX_ROC_POINTS: usize = 20;

/// Test-set accuracy per model name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelAccuracies(pub BTreeMap<String, f64>);

impl ModelAccuracies {
    #[must_use]
    pub fn get(&self, model: &str) -> Option<f64> {
        self.0.get(model).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Models ordered best first. Ties keep name order.
    #[must_use]
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> =
            self.0.iter().map(|(name, acc)| (name.as_str(), *acc)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Binary confusion matrix counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
    pub tp: u64,
}

impl ConfusionMatrix {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.tn + self.fp + self.fn_ + self.tp
    }
}

/// One point on the ROC curve (false positive rate, true positive rate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub value: f64,
}

/// Detailed evaluation of the reference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1_score", alias = "f1")]
    pub f1: f64,
    pub roc_auc: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub roc_curve: Vec<RocPoint>,
    pub feature_importance: Vec<FeatureImportance>,
    pub model_comparison: ModelAccuracies,
}

impl DetailedMetrics {
    /// Apply the serving invariants: at most [`MAX_ROC_POINTS`] curve points
    /// and feature importances sorted by descending value.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.roc_curve = sample_roc_curve(&self.roc_curve, MAX_ROC_POINTS);
        self.feature_importance
            .sort_by(|a, b| b.value.total_cmp(&a.value));
        self
    }
}

/// Sample a curve down to `max_points` evenly spaced points, keeping both ends.
///
/// Index `i` maps to `floor(i * (n - 1) / (max_points - 1))`, the same
/// integer truncation the training export uses. Curves already within the
/// limit are returned unchanged.
#[must_use]
pub fn sample_roc_curve(points: &[RocPoint], max_points: usize) -> Vec<RocPoint> {
    let n = points.len();
    if n <= max_points {
        return points.to_vec();
    }
    if max_points == 1 {
        return vec![points[0]];
    }
    (0..max_points)
        .map(|i| points[i * (n - 1) / (max_points - 1)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(n: usize) -> Vec<RocPoint> {
        (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1) as f64;
                RocPoint { x: t, y: t.sqrt() }
            })
            .collect()
    }

    #[test]
    fn test_sample_keeps_endpoints() {
        let points = curve(1000);
        let sampled = sample_roc_curve(&points, MAX_ROC_POINTS);
        assert_eq!(sampled.len(), MAX_ROC_POINTS);
        assert_eq!(sampled[0], points[0]);
        assert_eq!(sampled[MAX_ROC_POINTS - 1], points[999]);
        assert!(sampled.windows(2).all(|w| w[0].x <= w[1].x));
    }

    #[test]
    fn test_sample_matches_truncating_linspace() {
        let points = curve(45);
        let sampled = sample_roc_curve(&points, 20);
        // 44 * 7 / 19 = 16.2 -> 16
        assert_eq!(sampled[7], points[16]);
    }

    #[test]
    fn test_short_curve_untouched() {
        let points = curve(5);
        assert_eq!(sample_roc_curve(&points, MAX_ROC_POINTS), points);
    }

    #[test]
    fn test_ranked() {
        let acc = ModelAccuracies(BTreeMap::from([
            ("KNN".to_string(), 0.69),
            ("XGBoost".to_string(), 0.73),
            ("Decision Tree".to_string(), 0.71),
        ]));
        let names: Vec<&str> = acc.ranked().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["XGBoost", "Decision Tree", "KNN"]);
    }

    #[test]
    fn test_detailed_metrics_parse_and_normalize() {
        let json = serde_json::json!({
            "accuracy": 0.73, "precision": 0.75, "recall": 0.69,
            "f1_score": 0.72, "roc_auc": 0.80,
            "confusion_matrix": {"tn": 2600, "fp": 800, "fn": 1050, "tp": 2350},
            "roc_curve": curve(50),
            "feature_importance": [
                {"name": "gender", "value": 0.01},
                {"name": "ap_hi", "value": 0.42},
                {"name": "age", "value": 0.11}
            ],
            "model_comparison": {"XGBoost": 0.73}
        });

        let metrics: DetailedMetrics = serde_json::from_value(json).expect("Should parse");
        assert_eq!(metrics.confusion_matrix.fn_, 1050);
        assert_eq!(metrics.confusion_matrix.total(), 6800);

        let metrics = metrics.normalized();
        assert_eq!(metrics.roc_curve.len(), MAX_ROC_POINTS);
        assert_eq!(metrics.feature_importance[0].name, "ap_hi");
        assert_eq!(metrics.feature_importance[2].name, "gender");

        let back = serde_json::to_value(&metrics).expect("Serialize");
        assert!(back.get("f1_score").is_some());
        assert_eq!(back["confusion_matrix"]["fn"], 1050);
    }
}
