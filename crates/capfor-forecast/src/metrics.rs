//! Forecast quality scores.

use anyhow::{bail, Result};

use capfor_model::PredictiveDistribution;

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.is_empty() {
        bail!("cannot score an empty series");
    }
    if y_true.len() != y_pred.len() {
        bail!(
            "score inputs differ in length: {} vs {}",
            y_true.len(),
            y_pred.len()
        );
    }
    Ok(())
}

pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / y_true.len() as f64;
    Ok(mse.sqrt())
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let mae = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64;
    Ok(mae)
}

/// Pinball loss at quantile level `q`. Under-predictions are weighted by
/// `q`, over-predictions by `1 - q`, so the loss is minimized by the true
/// `q`-quantile.
pub fn pinball_loss(y_true: &[f64], y_pred: &[f64], q: f64) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if !(0.0..=1.0).contains(&q) {
        bail!("quantile level {q} outside [0, 1]");
    }
    let total: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| {
            let diff = t - p;
            if diff >= 0.0 {
                q * diff
            } else {
                (q - 1.0) * diff
            }
        })
        .sum();
    Ok(total / y_true.len() as f64)
}

/// Fraction of observations falling inside `[low, high]`, bounds
/// inclusive.
pub fn coverage_fraction(y_true: &[f64], low: &[f64], high: &[f64]) -> Result<f64> {
    check_lengths(y_true, low)?;
    check_lengths(y_true, high)?;
    let inside = y_true
        .iter()
        .zip(low.iter().zip(high))
        .filter(|(y, (lo, hi))| **lo <= **y && **y <= **hi)
        .count();
    Ok(inside as f64 / y_true.len() as f64)
}

/// Mean negative log-likelihood of the observations under the predictive
/// distribution.
pub fn negative_log_likelihood(y_true: &[f64], dist: &PredictiveDistribution) -> Result<f64> {
    if y_true.is_empty() {
        bail!("cannot score an empty series");
    }
    Ok(dist.mean_nll(y_true)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rmse_and_mae_on_constant_offset() {
        let y = vec![1.0, 2.0, 3.0];
        let p = vec![1.5, 2.5, 3.5];
        assert!((root_mean_squared_error(&y, &p).unwrap() - 0.5).abs() < 1e-12);
        assert!((mean_absolute_error(&y, &p).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn pinball_is_asymmetric() {
        let y = vec![1.0];
        // Under-prediction by 1 at q=0.9 costs 0.9.
        let under = pinball_loss(&y, &[0.0], 0.9).unwrap();
        assert!((under - 0.9).abs() < 1e-12);
        // Over-prediction by 1 at q=0.9 costs 0.1.
        let over = pinball_loss(&y, &[2.0], 0.9).unwrap();
        assert!((over - 0.1).abs() < 1e-12);
    }

    #[test]
    fn pinball_median_halves_mae() {
        let y = vec![0.0, 1.0, 2.0];
        let p = vec![0.5, 0.5, 0.5];
        let mae = mean_absolute_error(&y, &p).unwrap();
        let pb = pinball_loss(&y, &p, 0.5).unwrap();
        assert!((pb - mae / 2.0).abs() < 1e-12);
    }

    #[test]
    fn coverage_counts_inclusive_bounds() {
        let y = vec![0.5, 1.0, 2.0];
        let low = vec![0.0, 1.0, 3.0];
        let high = vec![1.0, 1.0, 4.0];
        // Midpoint inside, boundary value inside, third outside.
        let c = coverage_fraction(&y, &low, &high).unwrap();
        assert!((c - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(coverage_fraction(&[0.5], &[0.0], &[1.0]).unwrap(), 1.0);
        assert_eq!(coverage_fraction(&[5.0], &[0.0], &[1.0]).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(root_mean_squared_error(&[1.0], &[1.0, 2.0]).is_err());
        assert!(pinball_loss(&[], &[], 0.5).is_err());
        assert!(pinball_loss(&[1.0], &[1.0], 1.5).is_err());
    }

    #[test]
    fn nll_prefers_the_true_mean() {
        let dist_good = PredictiveDistribution::new(vec![1.0, 1.0], vec![0.5, 0.5]).unwrap();
        let dist_bad = PredictiveDistribution::new(vec![5.0, 5.0], vec![0.5, 0.5]).unwrap();
        let y = vec![1.0, 1.1];
        let good = negative_log_likelihood(&y, &dist_good).unwrap();
        let bad = negative_log_likelihood(&y, &dist_bad).unwrap();
        assert!(good < bad);
    }
}
