//! The per-column quantile forecast loop.
//!
//! Each capacity-factor column is trained and predicted independently. A
//! failure in one column is recorded and the run moves on, so a single
//! malformed series cannot take down a multi-hour batch.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{info, warn};

use capfor_core::{feature_set, CapforConfig};
use capfor_model::{
    grid_search, train_test_split, BoosterParams, NormalBooster, ParamGrid, PredictiveDistribution,
};

use crate::data::{parse_capfac_column, ForecastData};
use crate::metrics;

/// Predictions above this value are physically implausible; the clipped
/// output tables clamp to it (a little above 1.0 to keep genuine
/// near-capacity hours distinguishable from the cap).
const CLIP_MAX: f64 = 1.02;

/// A column the run could not forecast, with the reason it was recorded
/// under.
#[derive(Debug)]
pub struct ColumnFailure {
    pub column: String,
    pub reason: String,
}

/// What a forecast run produced.
pub struct ForecastSummary {
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<ColumnFailure>,
    /// Paths of the written prediction tables.
    pub tables: Vec<PathBuf>,
}

enum TrainingMode {
    /// Fixed hyper-parameters with early stopping on a held-out split.
    Standard,
    /// Cross-validated grid search, then a refit on all data.
    GridSearch,
}

pub struct QuantileForecaster<'a> {
    config: &'a CapforConfig,
}

impl<'a> QuantileForecaster<'a> {
    pub fn new(config: &'a CapforConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, data: &ForecastData) -> Result<ForecastSummary> {
        self.run_inner(data, TrainingMode::Standard)
    }

    pub fn run_grid_search(&self, data: &ForecastData) -> Result<ForecastSummary> {
        self.run_inner(data, TrainingMode::GridSearch)
    }

    fn run_inner(&self, data: &ForecastData, mode: TrainingMode) -> Result<ForecastSummary> {
        let quantiles = &self.config.forecast.quantiles;
        let columns = data.columns();
        let mut processed = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        // One prediction series per quantile per processed column.
        let mut predictions: Vec<Vec<Vec<f64>>> = vec![Vec::new(); quantiles.len()];

        for (i, column) in columns.iter().enumerate() {
            let Some((_, energy)) = parse_capfac_column(column) else {
                warn!("skipping column '{column}': not a <region> <index> <type> name");
                skipped.push(column.clone());
                continue;
            };
            if !energy.is_forecastable() || feature_set(energy).map_or(true, |f| f.is_empty()) {
                warn!(
                    "skipping column '{column}': no weather model for '{}'",
                    energy.as_str()
                );
                skipped.push(column.clone());
                continue;
            }

            info!("processing '{}' ({}/{})", column, i + 1, columns.len());
            match self.forecast_column(data, column, &mode) {
                Ok(dist) => {
                    for (qi, &q) in quantiles.iter().enumerate() {
                        predictions[qi].push(dist.quantile(q)?);
                    }
                    processed.push(column.clone());
                }
                Err(e) => {
                    warn!("column '{column}' failed: {e:#}");
                    failed.push(ColumnFailure {
                        column: column.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        let tables = if processed.is_empty() {
            warn!("no columns produced forecasts; nothing to write");
            Vec::new()
        } else {
            self.write_tables(data, &processed, quantiles, &predictions)?
        };

        info!(
            "forecast run finished: {} processed, {} skipped, {} failed",
            processed.len(),
            skipped.len(),
            failed.len()
        );
        Ok(ForecastSummary {
            processed,
            skipped,
            failed,
            tables,
        })
    }

    /// Train one column's model and predict the full series.
    fn forecast_column(
        &self,
        data: &ForecastData,
        column: &str,
        mode: &TrainingMode,
    ) -> Result<PredictiveDistribution> {
        let (y, x) = data.training_data(column)?;
        let fc = &self.config.forecast;
        let base = BoosterParams {
            n_estimators: fc.n_estimators,
            learning_rate: fc.learning_rate,
            max_depth: fc.max_depth,
            minibatch_frac: fc.minibatch_frac,
            seed: fc.seed,
            ..BoosterParams::default()
        };

        let dist = match mode {
            TrainingMode::Standard => {
                let (train_idx, test_idx) = train_test_split(y.len(), fc.test_fraction, fc.seed)?;
                let x_train = x.take_rows(&train_idx);
                let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
                let x_val = x.take_rows(&test_idx);
                let y_val: Vec<f64> = test_idx.iter().map(|&i| y[i]).collect();

                let booster = NormalBooster::fit_with_validation(
                    base,
                    &x_train,
                    &y_train,
                    &x_val,
                    &y_val,
                    fc.early_stopping_rounds,
                )?;
                info!(
                    "'{}': stopped at iteration {}",
                    column,
                    booster.best_iteration()
                );
                log_importances(column, &booster);
                booster.predict_dist(&x, Some(booster.best_iteration()))?
            }
            TrainingMode::GridSearch => {
                let sc = &self.config.search;
                let grid = ParamGrid {
                    max_depth: sc.max_depth.clone(),
                    n_estimators: sc.n_estimators.clone(),
                    learning_rate: sc.learning_rate.clone(),
                    minibatch_frac: sc.minibatch_frac.clone(),
                };
                let (train_idx, _) = train_test_split(y.len(), fc.test_fraction, fc.seed)?;
                let x_train = x.take_rows(&train_idx);
                let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
                let outcome =
                    grid_search(&x_train, &y_train, &grid, &base, sc.cv_folds, sc.jobs)?;
                info!(
                    "'{}': best params depth={} estimators={} lr={} minibatch={} (nll {:.4})",
                    column,
                    outcome.params.max_depth,
                    outcome.params.n_estimators,
                    outcome.params.learning_rate,
                    outcome.params.minibatch_frac,
                    outcome.score
                );
                let booster = NormalBooster::fit(outcome.params, &x_train, &y_train)?;
                log_importances(column, &booster);
                booster.predict_dist(&x, None)?
            }
        };

        self.log_scores(column, &y, &dist)?;
        Ok(dist)
    }

    /// In-sample scores, logged per quantile so runs can be compared from
    /// the log alone.
    fn log_scores(&self, column: &str, y: &[f64], dist: &PredictiveDistribution) -> Result<()> {
        let nll = metrics::negative_log_likelihood(y, dist)?;
        info!("'{column}': nll {nll:.4}");
        for &q in &self.config.forecast.quantiles {
            let pred = dist.quantile(q)?;
            if (q - 0.5).abs() < 1e-9 {
                let rmse = metrics::root_mean_squared_error(y, &pred)?;
                let mae = metrics::mean_absolute_error(y, &pred)?;
                info!("'{column}' q=0.50: rmse {rmse:.4}, mae {mae:.4}");
            } else {
                let pb = metrics::pinball_loss(y, &pred, q)?;
                info!("'{column}' q={q:.2}: pinball {pb:.4}");
            }
        }
        let lowest = self
            .config
            .forecast
            .quantiles
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        let highest = self
            .config
            .forecast
            .quantiles
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        if highest > lowest {
            let cov = metrics::coverage_fraction(y, &dist.quantile(lowest)?, &dist.quantile(highest)?)?;
            info!("'{column}': [{lowest:.2}, {highest:.2}] coverage {cov:.3}");
        }
        Ok(())
    }

    /// One raw and one clipped CSV per quantile, columns in processing
    /// order after the snapshot index.
    fn write_tables(
        &self,
        data: &ForecastData,
        processed: &[String],
        quantiles: &[f64],
        predictions: &[Vec<Vec<f64>>],
    ) -> Result<Vec<PathBuf>> {
        let out_dir = &self.config.paths.output_dir;
        fs::create_dir_all(out_dir)
            .with_context(|| format!("creating output directory {}", out_dir.display()))?;
        let snapshots = data.snapshots()?;
        let mut tables = Vec::new();

        for (qi, &q) in quantiles.iter().enumerate() {
            let label = (q * 100.0).round() as u32;

            let mut series = vec![Series::new("snapshot", snapshots.clone())];
            for (column, values) in processed.iter().zip(&predictions[qi]) {
                series.push(Series::new(column, values.clone()));
            }
            let mut frame = DataFrame::new(series)?;
            let raw_path = out_dir.join(format!("capfacts_pred_q{label}.csv"));
            write_csv(&raw_path, &mut frame)?;
            info!("wrote {}", raw_path.display());
            tables.push(raw_path);

            let mut series = vec![Series::new("snapshot", snapshots.clone())];
            for (column, values) in processed.iter().zip(&predictions[qi]) {
                let clipped: Vec<f64> = values.iter().map(|v| v.clamp(0.0, CLIP_MAX)).collect();
                series.push(Series::new(column, clipped));
            }
            let mut frame = DataFrame::new(series)?;
            let clipped_path = out_dir.join(format!("capfacts_pred_q{label}_clipped.csv"));
            write_csv(&clipped_path, &mut frame)?;
            info!("wrote {}", clipped_path.display());
            tables.push(clipped_path);
        }
        Ok(tables)
    }
}

fn write_csv(path: &std::path::Path, frame: &mut DataFrame) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(frame)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn log_importances(column: &str, booster: &NormalBooster) {
    let importances = booster.feature_importances();
    let formatted: Vec<String> = importances.iter().map(|v| format!("{v:.3}")).collect();
    info!("'{column}': feature importances [{}]", formatted.join(", "));
}
