//! Natural-gradient boosting over a Normal predictive distribution.
//!
//! Each boosting stage fits one regression tree per distribution
//! parameter (mean and log-std) on the natural gradient of the Normal
//! log score, then steps both parameters by a fixed learning rate. With
//! the (mean, log-std) parametrization the natural gradients are
//!
//!   g_mean    = mean - y
//!   g_log_std = (1 - ((y - mean) / std)^2) / 2
//!
//! Training against a validation set stops early once the validation
//! NLL fails to improve for a configured number of consecutive rounds;
//! the best-seen iteration is retained for prediction.

use rand::seq::SliceRandom;
use rand::SeedableRng;

use capfor_core::{CapforError, CapforResult};

use crate::dist::PredictiveDistribution;
use crate::matrix::FeatureMatrix;
use crate::tree::{RegressionTree, TreeParams};

/// Bound on the log-std state so sigma stays positive and finite.
const LOG_STD_BOUND: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct BoosterParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of training rows sampled per iteration, in (0, 1].
    pub minibatch_frac: f64,
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            learning_rate: 0.01,
            max_depth: 3,
            min_samples_leaf: 1,
            minibatch_frac: 1.0,
            seed: 42,
        }
    }
}

#[derive(Debug)]
struct Stage {
    mean_tree: RegressionTree,
    log_std_tree: RegressionTree,
}

#[derive(Debug)]
pub struct NormalBooster {
    params: BoosterParams,
    init_mean: f64,
    init_log_std: f64,
    stages: Vec<Stage>,
    /// Number of stages to use at prediction time: the iteration with the
    /// best validation score when a validation set was given, otherwise
    /// all trained stages.
    best_iteration: usize,
    feature_gains: Vec<f64>,
}

impl NormalBooster {
    /// Fit without a validation set; all `n_estimators` stages are kept.
    pub fn fit(params: BoosterParams, x: &FeatureMatrix, y: &[f64]) -> CapforResult<Self> {
        Self::fit_inner(params, x, y, None)
    }

    /// Fit with early stopping against a held-out validation set.
    pub fn fit_with_validation(
        params: BoosterParams,
        x_train: &FeatureMatrix,
        y_train: &[f64],
        x_val: &FeatureMatrix,
        y_val: &[f64],
        early_stopping_rounds: usize,
    ) -> CapforResult<Self> {
        Self::fit_inner(
            params,
            x_train,
            y_train,
            Some((x_val, y_val, early_stopping_rounds)),
        )
    }

    fn fit_inner(
        params: BoosterParams,
        x: &FeatureMatrix,
        y: &[f64],
        validation: Option<(&FeatureMatrix, &[f64], usize)>,
    ) -> CapforResult<Self> {
        if x.rows() != y.len() {
            return Err(CapforError::ShapeMismatch {
                expected: x.rows(),
                got: y.len(),
            });
        }
        if y.len() < 2 {
            return Err(CapforError::Other(format!(
                "need at least 2 training samples, got {}",
                y.len()
            )));
        }
        if !(0.0..=1.0).contains(&params.minibatch_frac) || params.minibatch_frac == 0.0 {
            return Err(CapforError::Other(format!(
                "minibatch_frac must be in (0, 1], got {}",
                params.minibatch_frac
            )));
        }
        if let Some((x_val, y_val, _)) = validation {
            if x_val.rows() != y_val.len() {
                return Err(CapforError::ShapeMismatch {
                    expected: x_val.rows(),
                    got: y_val.len(),
                });
            }
        }

        let n = y.len();
        let init_mean = y.iter().sum::<f64>() / n as f64;
        let variance = y.iter().map(|v| (v - init_mean).powi(2)).sum::<f64>() / n as f64;
        let init_log_std = variance.sqrt().max(1e-3).ln();

        let mut mean = vec![init_mean; n];
        let mut log_std = vec![init_log_std; n];
        let mut val_state = validation.map(|(x_val, _, _)| {
            (
                vec![init_mean; x_val.rows()],
                vec![init_log_std; x_val.rows()],
            )
        });

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(params.seed);
        let mut all_rows: Vec<usize> = (0..n).collect();
        let batch_size = ((n as f64) * params.minibatch_frac).ceil().max(2.0) as usize;

        let mut stages = Vec::new();
        let mut feature_gains = vec![0.0; x.cols()];
        let mut best_loss = f64::INFINITY;
        let mut best_iteration = 0;
        let mut rounds_without_improvement = 0;

        for _ in 0..params.n_estimators {
            let batch: &[usize] = if batch_size < n {
                all_rows.shuffle(&mut rng);
                &all_rows[..batch_size]
            } else {
                &all_rows
            };

            let mut g_mean = vec![0.0; n];
            let mut g_log_std = vec![0.0; n];
            for &i in batch {
                let sigma = log_std[i].exp();
                let z = (y[i] - mean[i]) / sigma;
                g_mean[i] = mean[i] - y[i];
                g_log_std[i] = 0.5 * (1.0 - z * z);
            }

            let mean_tree = RegressionTree::fit(x, &g_mean, batch, tree_params);
            let log_std_tree = RegressionTree::fit(x, &g_log_std, batch, tree_params);
            for (gain_slot, gain) in feature_gains
                .iter_mut()
                .zip(mean_tree.feature_gains().iter().zip(log_std_tree.feature_gains()))
            {
                *gain_slot += gain.0 + gain.1;
            }

            for i in 0..n {
                let row = x.row(i);
                mean[i] -= params.learning_rate * mean_tree.predict_row(row);
                log_std[i] = (log_std[i] - params.learning_rate * log_std_tree.predict_row(row))
                    .clamp(-LOG_STD_BOUND, LOG_STD_BOUND);
            }
            stages.push(Stage {
                mean_tree,
                log_std_tree,
            });

            if let (Some((val_mean, val_log_std)), Some((x_val, y_val, patience))) =
                (val_state.as_mut(), validation)
            {
                let stage = &stages[stages.len() - 1];
                for i in 0..x_val.rows() {
                    let row = x_val.row(i);
                    val_mean[i] -= params.learning_rate * stage.mean_tree.predict_row(row);
                    val_log_std[i] = (val_log_std[i]
                        - params.learning_rate * stage.log_std_tree.predict_row(row))
                    .clamp(-LOG_STD_BOUND, LOG_STD_BOUND);
                }
                let dist = PredictiveDistribution::new(
                    val_mean.clone(),
                    val_log_std.iter().map(|ls| ls.exp()).collect(),
                )?;
                let val_loss = dist.mean_nll(y_val)?;
                if val_loss < best_loss {
                    best_loss = val_loss;
                    best_iteration = stages.len();
                    rounds_without_improvement = 0;
                } else {
                    rounds_without_improvement += 1;
                    if rounds_without_improvement >= patience {
                        break;
                    }
                }
            }
        }

        if validation.is_none() {
            best_iteration = stages.len();
        }
        Ok(Self {
            params,
            init_mean,
            init_log_std,
            stages,
            best_iteration,
            feature_gains,
        })
    }

    /// Iteration (stage count) with the best validation score.
    pub fn best_iteration(&self) -> usize {
        self.best_iteration
    }

    /// Split-gain importances over both parameter trees, normalized to
    /// sum to one. Position k corresponds to feature column k.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.feature_gains.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.feature_gains.len()];
        }
        self.feature_gains.iter().map(|g| g / total).collect()
    }

    /// Predictive distribution over `x` using the first `max_iter` stages
    /// (defaults to the best iteration, never more than were trained).
    pub fn predict_dist(
        &self,
        x: &FeatureMatrix,
        max_iter: Option<usize>,
    ) -> CapforResult<PredictiveDistribution> {
        let k = max_iter
            .unwrap_or(self.best_iteration)
            .min(self.stages.len());
        let mut means = Vec::with_capacity(x.rows());
        let mut stds = Vec::with_capacity(x.rows());
        for i in 0..x.rows() {
            let row = x.row(i);
            let mut mean = self.init_mean;
            let mut log_std = self.init_log_std;
            for stage in &self.stages[..k] {
                mean -= self.params.learning_rate * stage.mean_tree.predict_row(row);
                log_std = (log_std - self.params.learning_rate * stage.log_std_tree.predict_row(row))
                    .clamp(-LOG_STD_BOUND, LOG_STD_BOUND);
            }
            means.push(mean);
            stds.push(log_std.exp());
        }
        PredictiveDistribution::new(means, stds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data(n: usize) -> (FeatureMatrix, Vec<f64>) {
        let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| if i < n / 2 { 0.2 } else { 0.8 }).collect();
        (FeatureMatrix::from_columns(&[xs]).unwrap(), y)
    }

    fn quick_params() -> BoosterParams {
        BoosterParams {
            n_estimators: 60,
            learning_rate: 0.1,
            max_depth: 2,
            ..BoosterParams::default()
        }
    }

    #[test]
    fn learns_a_step_function() {
        let (x, y) = step_data(40);
        let booster = NormalBooster::fit(quick_params(), &x, &y).unwrap();
        let dist = booster.predict_dist(&x, None).unwrap();
        let median = dist.quantile(0.5).unwrap();
        assert!((median[0] - 0.2).abs() < 0.05, "got {}", median[0]);
        assert!((median[39] - 0.8).abs() < 0.05, "got {}", median[39]);
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let (x, y) = step_data(40);
        let params = BoosterParams {
            minibatch_frac: 0.5,
            ..quick_params()
        };
        let a = NormalBooster::fit(params.clone(), &x, &y).unwrap();
        let b = NormalBooster::fit(params, &x, &y).unwrap();
        assert_eq!(
            a.predict_dist(&x, None).unwrap().means(),
            b.predict_dist(&x, None).unwrap().means()
        );
    }

    #[test]
    fn early_stopping_retains_best_iteration() {
        let (x, y) = step_data(40);
        let (x_val, y_val) = step_data(20);
        let booster =
            NormalBooster::fit_with_validation(quick_params(), &x, &y, &x_val, &y_val, 2).unwrap();
        assert!(booster.best_iteration() >= 1);
        assert!(booster.best_iteration() <= 60);
        // The best-iteration prediction is what `None` decodes.
        let best = booster.predict_dist(&x, None).unwrap();
        let explicit = booster.predict_dist(&x, Some(booster.best_iteration())).unwrap();
        assert_eq!(best.means(), explicit.means());
    }

    #[test]
    fn validation_improves_over_initial_fit() {
        let (x, y) = step_data(40);
        let (x_val, y_val) = step_data(20);
        let booster =
            NormalBooster::fit_with_validation(quick_params(), &x, &y, &x_val, &y_val, 5).unwrap();
        let trained_nll = booster
            .predict_dist(&x_val, None)
            .unwrap()
            .mean_nll(&y_val)
            .unwrap();
        let initial_nll = booster
            .predict_dist(&x_val, Some(0))
            .unwrap()
            .mean_nll(&y_val)
            .unwrap();
        assert!(trained_nll < initial_nll);
    }

    #[test]
    fn importances_sum_to_one_and_favor_signal() {
        let n = 40;
        let signal: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 7919) % 13) as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| if i < n / 2 { 0.1 } else { 0.9 }).collect();
        let x = FeatureMatrix::from_columns(&[noise, signal]).unwrap();
        let booster = NormalBooster::fit(quick_params(), &x, &y).unwrap();
        let importances = booster.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[1] > importances[0]);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let (x, _) = step_data(10);
        let err = NormalBooster::fit(BoosterParams::default(), &x, &[1.0; 5]).unwrap_err();
        assert!(matches!(err, CapforError::ShapeMismatch { .. }));
    }
}
