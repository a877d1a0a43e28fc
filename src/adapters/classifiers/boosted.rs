//! Gradient-boosted trees in the XGBoost JSON model layout.
//!
//! Each tree stores node arrays as XGBoost dumps them with `save_model`.
//! Leaves keep their output in `split_conditions`. A sample goes left when
//! `x[split_indices[i]] < split_conditions[i]`; missing values follow
//! `default_left`.

use serde::{Deserialize, Deserializer, Serialize};

use super::linear::sigmoid;
use crate::ports::{check_input, Classifier, ModelError};

const LEAF: i64 = -1;

fn default_base_score() -> f64 {
    0.5
}

/// XGBoost writes `default_left` as booleans in older dumps and as 0/1 in newer ones.
fn deserialize_flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(u8),
    }

    let flags = Vec::<Flag>::deserialize(deserializer)?;
    Ok(flags
        .into_iter()
        .map(|f| match f {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        })
        .collect())
}

/// One regression tree of the ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub left_children: Vec<i64>,
    pub right_children: Vec<i64>,
    pub split_indices: Vec<i64>,
    pub split_conditions: Vec<f64>,
    #[serde(deserialize_with = "deserialize_flags")]
    pub default_left: Vec<bool>,
}

impl RegressionTree {
    fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        let n = self.left_children.len();
        if n == 0 {
            return Err(ModelError::Malformed("tree has no nodes".into()));
        }
        if self.right_children.len() != n
            || self.split_indices.len() != n
            || self.split_conditions.len() != n
            || self.default_left.len() != n
        {
            return Err(ModelError::Malformed("tree arrays differ in length".into()));
        }
        for i in 0..n {
            if !self.split_conditions[i].is_finite() {
                return Err(ModelError::Malformed(format!(
                    "node {i} has non-finite split condition"
                )));
            }
            let (left, right) = (self.left_children[i], self.right_children[i]);
            if left == LEAF {
                continue;
            }
            let forward = |child: i64| child > i as i64 && (child as usize) < n;
            if !forward(left) || !forward(right) {
                return Err(ModelError::Malformed(format!(
                    "node {i} has invalid children ({left}, {right})"
                )));
            }
            let f = self.split_indices[i];
            if f < 0 || f as usize >= n_features {
                return Err(ModelError::Malformed(format!(
                    "node {i} splits on feature {f}, model has {n_features}"
                )));
            }
        }
        Ok(())
    }

    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        while self.left_children[node] != LEAF {
            let value = x[self.split_indices[node] as usize];
            let go_left = if value.is_nan() {
                self.default_left[node]
            } else {
                value < self.split_conditions[node]
            };
            node = if go_left {
                self.left_children[node] as usize
            } else {
                self.right_children[node] as usize
            };
        }
        self.split_conditions[node]
    }
}

/// Binary logistic boosted ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    pub n_features: usize,

    /// Initial prediction as a probability
    #[serde(default = "default_base_score")]
    pub base_score: f64,

    pub trees: Vec<RegressionTree>,
}

impl BoostedTrees {
    /// # Errors
    /// Returns `ModelError::Malformed` for an empty ensemble, a base score
    /// outside (0, 1) or any invalid tree.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Malformed("ensemble has no trees".into()));
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return Err(ModelError::Malformed(format!(
                "base_score {} must lie in (0, 1)",
                self.base_score
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ModelError::Malformed(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }

    /// Raw log-odds before the logistic link.
    fn margin(&self, x: &[f64]) -> Result<f64, ModelError> {
        check_input(x, self.n_features)?;
        let base = (self.base_score / (1.0 - self.base_score)).ln();
        let margin = base + self.trees.iter().map(|t| t.leaf_value(x)).sum::<f64>();
        if margin.is_finite() {
            Ok(margin)
        } else {
            Err(ModelError::NonFiniteOutput)
        }
    }
}

impl Classifier for BoostedTrees {
    fn kind(&self) -> &'static str {
        "xgboost"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &[f64]) -> Result<u8, ModelError> {
        Ok(u8::from(self.margin(x)? > 0.0))
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<f64>, ModelError> {
        Ok(Some(sigmoid(self.margin(x)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits on feature 1 at 0.0; leaves -0.4 (left) and 0.6 (right).
    fn stump(default_left: bool) -> RegressionTree {
        RegressionTree {
            left_children: vec![1, -1, -1],
            right_children: vec![2, -1, -1],
            split_indices: vec![1, 0, 0],
            split_conditions: vec![0.0, -0.4, 0.6],
            default_left: vec![default_left, false, false],
        }
    }

    fn ensemble() -> BoostedTrees {
        BoostedTrees {
            n_features: 2,
            base_score: 0.5,
            trees: vec![stump(true), stump(false)],
        }
    }

    #[test]
    fn test_strict_less_than_split() {
        let m = ensemble();
        assert!(m.validate().is_ok());
        // x[1] == 0.0 is not < 0.0, so both trees go right: margin 1.2
        let p = m.predict_proba(&[0.0, 0.0]).expect("Proba").expect("Supported");
        assert!((p - sigmoid(1.2)).abs() < 1e-12);
        assert_eq!(m.predict(&[0.0, 0.0]), Ok(1));
        assert_eq!(m.predict(&[0.0, -1.0]), Ok(0));
    }

    #[test]
    fn test_base_score_shifts_margin() {
        let mut m = ensemble();
        m.base_score = 0.2;
        let p = m.predict_proba(&[0.0, -1.0]).expect("Proba").expect("Supported");
        let expected = sigmoid((0.2f64 / 0.8).ln() - 0.8);
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        assert_eq!(stump(true).leaf_value(&[0.0, f64::NAN]), -0.4);
        assert_eq!(stump(false).leaf_value(&[0.0, f64::NAN]), 0.6);
    }

    #[test]
    fn test_parses_integer_default_left() {
        let json = serde_json::json!({
            "n_features": 2,
            "trees": [{
                "left_children": [1, -1, -1],
                "right_children": [2, -1, -1],
                "split_indices": [0, 0, 0],
                "split_conditions": [1.5, -0.1, 0.1],
                "default_left": [1, 0, 0]
            }]
        });
        let m: BoostedTrees = serde_json::from_value(json).expect("Should parse");
        assert_eq!(m.base_score, 0.5);
        assert_eq!(m.trees[0].default_left, vec![true, false, false]);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_score() {
        let mut m = ensemble();
        m.base_score = 1.0;
        assert!(m.validate().is_err());
    }
}
