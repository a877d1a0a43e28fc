//! Decision tree and random forest evaluators.
//!
//! Trees use the scikit-learn `tree_` array layout: node `i` is a leaf iff
//! `children_left[i] == -1`, otherwise the sample goes left when
//! `x[feature[i]] <= threshold[i]`.

use serde::{Deserialize, Serialize};

use crate::ports::{check_input, Classifier, ModelError};

const LEAF: i64 = -1;

/// Flat node arrays of one fitted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNodes {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights `[class 0, class 1]`
    pub value: Vec<[f64; 2]>,
}

impl TreeNodes {
    /// Check array shapes and that every split points forward.
    ///
    /// Children strictly after their parent guarantees traversal terminates.
    ///
    /// # Errors
    /// Returns `ModelError::Malformed` describing the first problem found.
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        let n = self.children_left.len();
        if n == 0 {
            return Err(ModelError::Malformed("tree has no nodes".into()));
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(ModelError::Malformed("tree arrays differ in length".into()));
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == LEAF {
                let [c0, c1] = self.value[i];
                if !(c0.is_finite() && c1.is_finite()) || c0 < 0.0 || c1 < 0.0 || c0 + c1 <= 0.0 {
                    return Err(ModelError::Malformed(format!("leaf {i} has invalid value")));
                }
                continue;
            }
            let forward = |child: i64| child > i as i64 && (child as usize) < n;
            if !forward(left) || !forward(right) {
                return Err(ModelError::Malformed(format!(
                    "node {i} has invalid children ({left}, {right})"
                )));
            }
            let f = self.feature[i];
            if f < 0 || f as usize >= n_features {
                return Err(ModelError::Malformed(format!(
                    "node {i} splits on feature {f}, model has {n_features}"
                )));
            }
            if !self.threshold[i].is_finite() {
                return Err(ModelError::Malformed(format!("node {i} has non-finite threshold")));
            }
        }
        Ok(())
    }

    /// Class-1 probability at the leaf reached by `x`.
    fn leaf_probability(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let f = self.feature[node] as usize;
            node = if x[f] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        let [c0, c1] = self.value[node];
        c1 / (c0 + c1)
    }
}

/// Single CART decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    #[serde(flatten)]
    pub nodes: TreeNodes,
}

impl DecisionTree {
    /// # Errors
    /// See [`TreeNodes::validate`].
    pub fn validate(&self) -> Result<(), ModelError> {
        self.nodes.validate(self.n_features)
    }
}

impl Classifier for DecisionTree {
    fn kind(&self) -> &'static str {
        "decision_tree"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &[f64]) -> Result<u8, ModelError> {
        let p = self.predict_proba(x)?.unwrap_or_default();
        Ok(u8::from(p > 0.5))
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<f64>, ModelError> {
        check_input(x, self.n_features)?;
        Ok(Some(self.nodes.leaf_probability(x)))
    }
}

/// Bagged ensemble of decision trees; probability is the tree average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<TreeNodes>,
}

impl RandomForest {
    /// # Errors
    /// Returns `ModelError::Malformed` for an empty forest or any invalid tree.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Malformed("forest has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| ModelError::Malformed(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn kind(&self) -> &'static str {
        "random_forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, x: &[f64]) -> Result<u8, ModelError> {
        let p = self.predict_proba(x)?.unwrap_or_default();
        Ok(u8::from(p > 0.5))
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<f64>, ModelError> {
        check_input(x, self.n_features)?;
        let total: f64 = self.trees.iter().map(|t| t.leaf_probability(x)).sum();
        Ok(Some(total / self.trees.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root splits on feature 0 at 0.5; left leaf is mostly class 0.
    fn stump(left: [f64; 2], right: [f64; 2]) -> TreeNodes {
        TreeNodes {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![[50.0, 50.0], left, right],
        }
    }

    #[test]
    fn test_tree_goes_left_on_equal_threshold() {
        let tree = DecisionTree {
            n_features: 2,
            nodes: stump([9.0, 1.0], [2.0, 8.0]),
        };
        assert!(tree.validate().is_ok());
        assert_eq!(tree.predict(&[0.5, 0.0]), Ok(0));
        assert_eq!(tree.predict_proba(&[0.5, 0.0]), Ok(Some(0.1)));
        assert_eq!(tree.predict(&[0.6, 0.0]), Ok(1));
        assert_eq!(tree.predict_proba(&[0.6, 0.0]), Ok(Some(0.8)));
    }

    #[test]
    fn test_tree_tie_is_class_zero() {
        let tree = DecisionTree {
            n_features: 1,
            nodes: stump([5.0, 5.0], [0.0, 1.0]),
        };
        assert_eq!(tree.predict(&[0.0]), Ok(0));
    }

    #[test]
    fn test_tree_parses_flat_layout() {
        let json = serde_json::json!({
            "n_features": 1,
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [0, -2, -2],
            "threshold": [0.0, -2.0, -2.0],
            "value": [[1.0, 1.0], [1.0, 0.0], [0.0, 1.0]]
        });
        let tree: DecisionTree = serde_json::from_value(json).expect("Should parse");
        assert!(tree.validate().is_ok());
        assert_eq!(tree.predict(&[1.0]), Ok(1));
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let mut nodes = stump([1.0, 0.0], [0.0, 1.0]);
        nodes.children_left[0] = 0;
        let err = nodes.validate(1).expect_err("Must fail");
        assert!(err.to_string().contains("node 0"));
    }

    #[test]
    fn test_validate_rejects_feature_out_of_range() {
        let mut nodes = stump([1.0, 0.0], [0.0, 1.0]);
        nodes.feature[0] = 3;
        assert!(nodes.validate(2).is_err());
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForest {
            n_features: 1,
            trees: vec![
                stump([1.0, 0.0], [0.0, 1.0]),
                stump([1.0, 0.0], [1.0, 1.0]),
                stump([0.0, 1.0], [1.0, 0.0]),
            ],
        };
        assert!(forest.validate().is_ok());

        // Right leaves: 1.0, 0.5, 0.0 -> 0.5, not above threshold
        let p = forest.predict_proba(&[1.0]).expect("Proba").expect("Supported");
        assert!((p - 0.5).abs() < 1e-12);
        assert_eq!(forest.predict(&[1.0]), Ok(0));

        // Left leaves: 0.0, 0.0, 1.0 -> 1/3
        assert_eq!(forest.predict(&[0.0]), Ok(0));
    }

    #[test]
    fn test_forest_rejects_non_finite_input() {
        let forest = RandomForest {
            n_features: 1,
            trees: vec![stump([1.0, 0.0], [0.0, 1.0])],
        };
        assert_eq!(
            forest.predict(&[f64::INFINITY]),
            Err(ModelError::NonFiniteInput { index: 0 })
        );
    }

    #[test]
    fn test_empty_forest_is_malformed() {
        let forest = RandomForest {
            n_features: 1,
            trees: vec![],
        };
        assert!(forest.validate().is_err());
    }
}
