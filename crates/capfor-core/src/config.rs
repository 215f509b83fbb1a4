//! Run configuration.
//!
//! One [`CapforConfig`] is constructed at process start (from a TOML file
//! or defaults) and passed by reference into each pipeline component. No
//! component reads ambient global state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapforConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Input and output locations. Tabular files may be `.csv` or `.parquet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Gridded weather dataset (long format, one row per grid point and
    /// timestep).
    #[serde(default = "default_weather_grid")]
    pub weather_grid: PathBuf,
    /// Onshore region polygons (GeoJSON FeatureCollection).
    #[serde(default = "default_onshore_regions")]
    pub onshore_regions: PathBuf,
    /// Offshore region polygons (GeoJSON FeatureCollection).
    #[serde(default = "default_offshore_regions")]
    pub offshore_regions: PathBuf,
    /// Historical capacity factors (CSV, leading `snapshot` column).
    #[serde(default = "default_capacity_factors")]
    pub capacity_factors: PathBuf,
    /// Regional weather dataset produced by the aggregation stage.
    #[serde(default = "default_regional_weather")]
    pub regional_weather: PathBuf,
    /// Directory for prediction tables.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Quantiles decoded from each predictive distribution.
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,
    /// Held-out fraction for early-stopping validation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the train/test split and the booster, so repeated runs
    /// produce identical partitions and fits.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Fraction of training rows sampled per boosting iteration.
    #[serde(default = "default_minibatch_frac")]
    pub minibatch_frac: f64,
    /// Consecutive rounds without validation improvement before training
    /// stops.
    #[serde(default = "default_early_stopping_rounds")]
    pub early_stopping_rounds: usize,
}

/// Hyperparameter grid for the cross-validated search mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_grid_depths")]
    pub max_depth: Vec<usize>,
    #[serde(default = "default_grid_estimators")]
    pub n_estimators: Vec<usize>,
    #[serde(default = "default_grid_learning_rates")]
    pub learning_rate: Vec<f64>,
    #[serde(default = "default_grid_minibatch_fracs")]
    pub minibatch_frac: Vec<f64>,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Worker threads for fold evaluation; 0 means one per CPU.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_weather_grid() -> PathBuf {
    PathBuf::from("resources/weather-grid.csv")
}

fn default_onshore_regions() -> PathBuf {
    PathBuf::from("resources/regions_onshore.geojson")
}

fn default_offshore_regions() -> PathBuf {
    PathBuf::from("resources/regions_offshore.geojson")
}

fn default_capacity_factors() -> PathBuf {
    PathBuf::from("resources/capfacs.csv")
}

fn default_regional_weather() -> PathBuf {
    PathBuf::from("resources/weather-regions.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_quantiles() -> Vec<f64> {
    vec![0.4, 0.5, 0.6]
}

fn default_test_fraction() -> f64 {
    0.25
}

fn default_seed() -> u64 {
    42
}

fn default_n_estimators() -> usize {
    500
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_max_depth() -> usize {
    3
}

fn default_minibatch_frac() -> f64 {
    1.0
}

fn default_early_stopping_rounds() -> usize {
    2
}

fn default_grid_depths() -> Vec<usize> {
    vec![2, 3, 4]
}

fn default_grid_estimators() -> Vec<usize> {
    vec![200, 500]
}

fn default_grid_learning_rates() -> Vec<f64> {
    vec![0.01, 0.05]
}

fn default_grid_minibatch_fracs() -> Vec<f64> {
    vec![0.5, 1.0]
}

fn default_cv_folds() -> usize {
    5
}

fn default_jobs() -> usize {
    4
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            weather_grid: default_weather_grid(),
            onshore_regions: default_onshore_regions(),
            offshore_regions: default_offshore_regions(),
            capacity_factors: default_capacity_factors(),
            regional_weather: default_regional_weather(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            quantiles: default_quantiles(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            n_estimators: default_n_estimators(),
            learning_rate: default_learning_rate(),
            max_depth: default_max_depth(),
            minibatch_frac: default_minibatch_frac(),
            early_stopping_rounds: default_early_stopping_rounds(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: default_grid_depths(),
            n_estimators: default_grid_estimators(),
            learning_rate: default_grid_learning_rates(),
            minibatch_frac: default_grid_minibatch_fracs(),
            cv_folds: default_cv_folds(),
            jobs: default_jobs(),
        }
    }
}

impl Default for CapforConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            forecast: ForecastConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl CapforConfig {
    /// Load configuration from a TOML file. Missing keys take their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file '{}'", path.display()))?;
        let config: CapforConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.forecast.quantiles.is_empty() {
            anyhow::bail!("at least one quantile is required");
        }
        for &q in &self.forecast.quantiles {
            if !(0.0..=1.0).contains(&q) {
                anyhow::bail!("quantile {q} is outside [0, 1]");
            }
        }
        if !(0.0..1.0).contains(&self.forecast.test_fraction) || self.forecast.test_fraction == 0.0
        {
            anyhow::bail!(
                "test_fraction must be in (0, 1), got {}",
                self.forecast.test_fraction
            );
        }
        if self.forecast.n_estimators == 0 {
            anyhow::bail!("n_estimators must be at least 1");
        }
        if self.forecast.learning_rate <= 0.0 || !self.forecast.learning_rate.is_finite() {
            anyhow::bail!(
                "learning_rate must be positive, got {}",
                self.forecast.learning_rate
            );
        }
        if !(0.0..=1.0).contains(&self.forecast.minibatch_frac)
            || self.forecast.minibatch_frac == 0.0
        {
            anyhow::bail!(
                "minibatch_frac must be in (0, 1], got {}",
                self.forecast.minibatch_frac
            );
        }
        if self.search.cv_folds < 2 {
            anyhow::bail!("cv_folds must be at least 2, got {}", self.search.cv_folds);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = CapforConfig::default();
        config.validate().unwrap();
        assert_eq!(config.forecast.quantiles, vec![0.4, 0.5, 0.6]);
        assert_eq!(config.forecast.test_fraction, 0.25);
        assert_eq!(config.forecast.seed, 42);
        assert_eq!(config.forecast.early_stopping_rounds, 2);
        assert_eq!(config.search.cv_folds, 5);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[forecast]\nquantiles = [0.1, 0.9]\n\n[paths]\noutput_dir = \"out\""
        )
        .unwrap();
        let config = CapforConfig::load(file.path()).unwrap();
        assert_eq!(config.forecast.quantiles, vec![0.1, 0.9]);
        assert_eq!(config.forecast.test_fraction, 0.25);
        assert_eq!(config.paths.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn degenerate_booster_params_are_rejected() {
        let mut config = CapforConfig::default();
        config.forecast.n_estimators = 0;
        assert!(config.validate().is_err());

        let mut config = CapforConfig::default();
        config.forecast.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = CapforConfig::default();
        config.forecast.learning_rate = -0.1;
        assert!(config.validate().is_err());

        let mut config = CapforConfig::default();
        config.forecast.minibatch_frac = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_quantile_is_rejected() {
        let config = CapforConfig {
            forecast: ForecastConfig {
                quantiles: vec![1.4],
                ..ForecastConfig::default()
            },
            ..CapforConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
