//! Normal predictive distribution produced by the booster, one
//! (mean, std) pair per input row.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use capfor_core::{CapforError, CapforResult};

#[derive(Debug, Clone)]
pub struct PredictiveDistribution {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl PredictiveDistribution {
    pub fn new(means: Vec<f64>, stds: Vec<f64>) -> CapforResult<Self> {
        if means.len() != stds.len() {
            return Err(CapforError::ShapeMismatch {
                expected: means.len(),
                got: stds.len(),
            });
        }
        Ok(Self { means, stds })
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Decode the quantile function at `q` for every row
    /// (inverse CDF of the per-row Normal).
    pub fn quantile(&self, q: f64) -> CapforResult<Vec<f64>> {
        if !(0.0..1.0).contains(&q) || q == 0.0 {
            return Err(CapforError::Other(format!(
                "quantile must be in (0, 1), got {q}"
            )));
        }
        let standard = Normal::new(0.0, 1.0)
            .map_err(|e| CapforError::Other(format!("standard normal: {e}")))?;
        let z = standard.inverse_cdf(q);
        Ok(self
            .means
            .iter()
            .zip(&self.stds)
            .map(|(mean, std)| mean + std * z)
            .collect())
    }

    /// Mean negative log likelihood of the observations under the per-row
    /// distributions. Smaller is better.
    pub fn mean_nll(&self, y_true: &[f64]) -> CapforResult<f64> {
        if y_true.len() != self.len() {
            return Err(CapforError::ShapeMismatch {
                expected: self.len(),
                got: y_true.len(),
            });
        }
        if y_true.is_empty() {
            return Err(CapforError::Other(
                "cannot score an empty distribution".into(),
            ));
        }
        let mut total = 0.0;
        for ((mean, std), y) in self.means.iter().zip(&self.stds).zip(y_true) {
            let normal = Normal::new(*mean, *std)
                .map_err(|e| CapforError::Other(format!("invalid normal ({mean}, {std}): {e}")))?;
            total -= normal.ln_pdf(*y);
        }
        Ok(total / y_true.len() as f64)
    }
}
