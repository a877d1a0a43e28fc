//! k-nearest-neighbours evaluator.

use serde::{Deserialize, Serialize};

use crate::ports::{check_input, Classifier, ModelError};

fn default_p() -> f64 {
    2.0
}

/// Neighbour vote weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weights {
    #[default]
    Uniform,
    /// Inverse distance; exact matches take all of the weight
    Distance,
}

/// Instance-based classifier over the stored (scaled) training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    pub n_neighbors: usize,
    #[serde(default)]
    pub weights: Weights,
    /// Minkowski exponent
    #[serde(default = "default_p")]
    pub p: f64,
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

impl KNearestNeighbors {
    /// # Errors
    /// Returns `ModelError::Malformed` for `k` outside `1..=samples`,
    /// ragged samples, labels other than 0/1 or `p < 1`.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.n_features();
        if self.samples.is_empty() || n == 0 {
            return Err(ModelError::Malformed("no training samples".into()));
        }
        if self.n_neighbors == 0 || self.n_neighbors > self.samples.len() {
            return Err(ModelError::Malformed(format!(
                "n_neighbors {} must be in 1..={}",
                self.n_neighbors,
                self.samples.len()
            )));
        }
        if self.labels.len() != self.samples.len() {
            return Err(ModelError::Malformed(format!(
                "{} labels for {} samples",
                self.labels.len(),
                self.samples.len()
            )));
        }
        if self.labels.iter().any(|l| *l > 1) {
            return Err(ModelError::Malformed("labels must be 0 or 1".into()));
        }
        if self.samples.iter().any(|s| s.len() != n) {
            return Err(ModelError::Malformed("samples differ in length".into()));
        }
        if self.samples.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ModelError::Malformed("non-finite sample value".into()));
        }
        if !(self.p.is_finite() && self.p >= 1.0) {
            return Err(ModelError::Malformed(format!("invalid Minkowski p {}", self.p)));
        }
        Ok(())
    }

    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        if self.p == 2.0 {
            return a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f64>()
                .sqrt();
        }
        if self.p == 1.0 {
            return a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum();
        }
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs().powf(self.p))
            .sum::<f64>()
            .powf(1.0 / self.p)
    }

    /// Vote weight for class 0 and class 1 among the k nearest samples.
    fn votes(&self, x: &[f64]) -> Result<[f64; 2], ModelError> {
        check_input(x, self.n_features())?;

        let mut neighbours: Vec<(f64, usize)> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (self.distance(s, x), i))
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        neighbours.truncate(self.n_neighbors);

        let exact = neighbours.iter().any(|(d, _)| *d == 0.0);
        let mut votes = [0.0; 2];
        for (d, i) in neighbours {
            let w = match self.weights {
                Weights::Uniform => 1.0,
                Weights::Distance if exact => f64::from(u8::from(d == 0.0)),
                Weights::Distance => 1.0 / d,
            };
            votes[usize::from(self.labels[i])] += w;
        }
        if votes.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(votes)
    }
}

impl Classifier for KNearestNeighbors {
    fn kind(&self) -> &'static str {
        "knn"
    }

    fn n_features(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    fn predict(&self, x: &[f64]) -> Result<u8, ModelError> {
        let [w0, w1] = self.votes(x)?;
        Ok(u8::from(w1 > w0))
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<f64>, ModelError> {
        let [w0, w1] = self.votes(x)?;
        Ok(Some(w1 / (w0 + w1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(k: usize, weights: Weights) -> KNearestNeighbors {
        KNearestNeighbors {
            n_neighbors: k,
            weights,
            p: 2.0,
            samples: vec![vec![0.0], vec![1.0], vec![3.0], vec![10.0]],
            labels: vec![0, 1, 1, 0],
        }
    }

    #[test]
    fn test_uniform_vote() {
        let m = model(3, Weights::Uniform);
        assert!(m.validate().is_ok());
        // Nearest to 1.2: 1.0 (1), 0.0 (0), 3.0 (1)
        assert_eq!(m.predict(&[1.2]), Ok(1));
        let p = m.predict_proba(&[1.2]).expect("Proba").expect("Supported");
        assert!((p - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_tie_is_class_zero() {
        let m = model(2, Weights::Uniform);
        assert_eq!(m.predict(&[0.4]), Ok(0));
        assert_eq!(m.predict_proba(&[0.4]), Ok(Some(0.5)));
    }

    #[test]
    fn test_distance_weighting() {
        let m = model(2, Weights::Distance);
        // 0.0 at distance 0.25, 1.0 at 0.75: weights 4 vs 4/3
        assert_eq!(m.predict(&[0.25]), Ok(0));
        let p = m.predict_proba(&[0.25]).expect("Proba").expect("Supported");
        assert!((p - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_exact_match_takes_all_weight() {
        let m = model(3, Weights::Distance);
        assert_eq!(m.predict_proba(&[10.0]), Ok(Some(0.0)));
        assert_eq!(m.predict_proba(&[1.0]), Ok(Some(1.0)));
    }

    #[test]
    fn test_manhattan_distance() {
        let m = KNearestNeighbors {
            p: 1.0,
            ..model(1, Weights::Uniform)
        };
        assert_eq!(m.distance(&[0.0, 0.0], &[3.0, 4.0]), 7.0);
        assert_eq!(model(1, Weights::Uniform).distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_validate_rejects_bad_k() {
        assert!(model(0, Weights::Uniform).validate().is_err());
        assert!(model(5, Weights::Uniform).validate().is_err());
    }

    #[test]
    fn test_defaults_from_json() {
        let json = serde_json::json!({
            "n_neighbors": 1,
            "samples": [[0.0, 0.0]],
            "labels": [1]
        });
        let m: KNearestNeighbors = serde_json::from_value(json).expect("Should parse");
        assert_eq!(m.weights, Weights::Uniform);
        assert_eq!(m.p, 2.0);
        assert_eq!(m.n_features(), 2);
    }
}
