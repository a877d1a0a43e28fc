//! Logistic regression evaluator.

use serde::{Deserialize, Serialize};

use crate::ports::{check_input, Classifier, ModelError};

/// Numerically stable logistic function.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic regression: `p = sigmoid(w . x + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    /// # Errors
    /// Returns `ModelError::Malformed` for empty or non-finite parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.is_empty() {
            return Err(ModelError::Malformed("no coefficients".into()));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::Malformed("non-finite coefficient".into()));
        }
        Ok(())
    }

    fn decision(&self, x: &[f64]) -> Result<f64, ModelError> {
        check_input(x, self.n_features())?;
        let z = self
            .coefficients
            .iter()
            .zip(x)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        if z.is_finite() {
            Ok(z)
        } else {
            Err(ModelError::NonFiniteOutput)
        }
    }
}

impl Classifier for LogisticRegression {
    fn kind(&self) -> &'static str {
        "logistic_regression"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, x: &[f64]) -> Result<u8, ModelError> {
        Ok(u8::from(self.decision(x)? > 0.0))
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<f64>, ModelError> {
        Ok(Some(sigmoid(self.decision(x)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LogisticRegression {
        LogisticRegression {
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
        }
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_predict_and_proba_agree() {
        let m = model();
        // 2*1 - 1*1 + 0.5 = 1.5
        assert_eq!(m.predict(&[1.0, 1.0]), Ok(1));
        let p = m.predict_proba(&[1.0, 1.0]).expect("Proba").expect("Supported");
        assert!((p - sigmoid(1.5)).abs() < 1e-12);

        // 0 - 2 + 0.5 = -1.5
        assert_eq!(m.predict(&[0.0, 2.0]), Ok(0));
        let p = m.predict_proba(&[0.0, 2.0]).expect("Proba").expect("Supported");
        assert!(p < 0.5);
    }

    #[test]
    fn test_boundary_is_class_zero() {
        let m = LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        assert_eq!(m.predict(&[0.0]), Ok(0));
    }

    #[test]
    fn test_rejects_wrong_length_and_nan() {
        let m = model();
        assert!(matches!(
            m.predict(&[1.0]),
            Err(ModelError::FeatureCount { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            m.predict(&[1.0, f64::NAN]),
            Err(ModelError::NonFiniteInput { index: 1 })
        ));
    }

    #[test]
    fn test_validate() {
        assert!(model().validate().is_ok());
        let empty = LogisticRegression {
            coefficients: vec![],
            intercept: 0.0,
        };
        assert!(empty.validate().is_err());
    }
}
