//! Support vector classifier evaluator.

use serde::{Deserialize, Serialize};

use crate::ports::{check_input, Classifier, ModelError};

/// Kernel function with its fitted hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: i32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        let dot = || a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>();
        match *self {
            Self::Linear => dot(),
            Self::Rbf { gamma } => {
                let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * sq).exp()
            }
            Self::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * dot() + coef0).powi(degree),
            Self::Sigmoid { gamma, coef0 } => (gamma * dot() + coef0).tanh(),
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        let ok = match *self {
            Self::Linear => true,
            Self::Rbf { gamma } => gamma.is_finite() && gamma > 0.0,
            Self::Poly {
                gamma,
                coef0,
                degree,
            } => gamma.is_finite() && coef0.is_finite() && degree >= 1,
            Self::Sigmoid { gamma, coef0 } => gamma.is_finite() && coef0.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(ModelError::Malformed(format!("invalid kernel {self:?}")))
        }
    }
}

/// Binary SVC: `f(x) = sum(a_i * K(sv_i, x)) + b`, class 1 iff `f > 0`.
///
/// `dual_coef` and `intercept` are scikit-learn's exported attributes, whose
/// sign already makes `f > 0` mean class 1. `prob_a`/`prob_b` are the raw
/// libsvm `probA_`/`probB_`, which act on the unflipped value `-f` and give
/// the probability of class 0, so `p(class 1) = 1 - 1 / (1 + exp(-prob_a * f + prob_b))`.
/// Probability is available only when both were exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportVectorClassifier {
    pub support_vectors: Vec<Vec<f64>>,
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    pub kernel: Kernel,
    #[serde(default, alias = "probA_")]
    pub prob_a: Option<f64>,
    #[serde(default, alias = "probB_")]
    pub prob_b: Option<f64>,
}

impl SupportVectorClassifier {
    /// # Errors
    /// Returns `ModelError::Malformed` for ragged or empty support vectors,
    /// mismatched coefficients or invalid kernel parameters.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.n_features();
        if self.support_vectors.is_empty() || n == 0 {
            return Err(ModelError::Malformed("no support vectors".into()));
        }
        if let Some(i) = self.support_vectors.iter().position(|sv| sv.len() != n) {
            return Err(ModelError::Malformed(format!(
                "support vector {i} has {} values, expected {n}",
                self.support_vectors[i].len()
            )));
        }
        if self.dual_coef.len() != self.support_vectors.len() {
            return Err(ModelError::Malformed(format!(
                "{} dual coefficients for {} support vectors",
                self.dual_coef.len(),
                self.support_vectors.len()
            )));
        }
        let finite = self.intercept.is_finite()
            && self.dual_coef.iter().all(|c| c.is_finite())
            && self.support_vectors.iter().flatten().all(|v| v.is_finite())
            && self.prob_a.map_or(true, f64::is_finite)
            && self.prob_b.map_or(true, f64::is_finite);
        if !finite {
            return Err(ModelError::Malformed("non-finite parameter".into()));
        }
        self.kernel.validate()
    }

    fn decision(&self, x: &[f64]) -> Result<f64, ModelError> {
        check_input(x, self.n_features())?;
        let f = self
            .support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, a)| a * self.kernel.eval(sv, x))
            .sum::<f64>()
            + self.intercept;
        if f.is_finite() {
            Ok(f)
        } else {
            Err(ModelError::NonFiniteOutput)
        }
    }
}

impl Classifier for SupportVectorClassifier {
    fn kind(&self) -> &'static str {
        "svc"
    }

    fn n_features(&self) -> usize {
        self.support_vectors.first().map_or(0, Vec::len)
    }

    fn predict(&self, x: &[f64]) -> Result<u8, ModelError> {
        Ok(u8::from(self.decision(x)? > 0.0))
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<f64>, ModelError> {
        let (Some(a), Some(b)) = (self.prob_a, self.prob_b) else {
            check_input(x, self.n_features())?;
            return Ok(None);
        };
        let f = self.decision(x)?;
        let p_negative = 1.0 / (1.0 + (-a * f + b).exp());
        Ok(Some(1.0 - p_negative))
    }
}
