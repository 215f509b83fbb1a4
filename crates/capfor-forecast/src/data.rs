//! Capacity-factor observations joined with the regional weather store.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::info;

use capfor_core::{
    feature_set, region_key, CapforConfig, CapforError, CapforResult, EnergyType,
};
use capfor_geo::{read_regional_dataset, RegionalDataset};
use capfor_model::FeatureMatrix;

/// Split a capacity-factor column name into its region and energy type.
/// The format is `<region> <index> <energy-suffix>` with single-space
/// separators; anything else — including doubled spaces or tabs — is not
/// a usable column and yields `None` (callers skip, they do not fail).
pub fn parse_capfac_column(name: &str) -> Option<(String, EnergyType)> {
    let tokens: Vec<&str> = name.split(' ').collect();
    match tokens.as_slice() {
        [region, index, suffix]
            if !region.is_empty() && !index.is_empty() && !suffix.is_empty() =>
        {
            Some((region.to_string(), EnergyType::from_suffix(suffix)))
        }
        _ => None,
    }
}

/// Capacity-factor column names containing `pattern`, read from the
/// capacity-factor table alone. Listing columns does not require the
/// regional weather dataset to exist.
pub fn find_capfact_columns(config: &CapforConfig, pattern: &str) -> Result<Vec<String>> {
    let path = &config.paths.capacity_factors;
    if !path.is_file() {
        return Err(CapforError::MissingInputFile {
            path: path.clone(),
            hint: "Provide the historical capacity factors as a CSV with a leading 'snapshot' column.".into(),
        }
        .into());
    }
    let capfacts = read_capfacts(path)?;
    Ok(capfacts
        .get_column_names()
        .iter()
        .filter(|name| **name != "snapshot" && name.contains(pattern))
        .map(|name| name.to_string())
        .collect())
}

/// The forecasting stage's view of the input data: the capacity-factor
/// table and the per-region weather series produced by aggregation.
pub struct ForecastData {
    capfacts: DataFrame,
    weather: RegionalDataset,
}

impl ForecastData {
    /// Open both inputs, reporting missing files with instructions before
    /// any further work.
    pub fn open(config: &CapforConfig) -> Result<Self> {
        let weather_path = &config.paths.regional_weather;
        if !weather_path.is_file() {
            return Err(CapforError::MissingInputFile {
                path: weather_path.clone(),
                hint: "Run `capfor aggregate` first to build the regional weather dataset.".into(),
            }
            .into());
        }
        let capfacts_path = &config.paths.capacity_factors;
        if !capfacts_path.is_file() {
            return Err(CapforError::MissingInputFile {
                path: capfacts_path.clone(),
                hint: "Provide the historical capacity factors as a CSV with a leading 'snapshot' column.".into(),
            }
            .into());
        }

        info!("opening regional weather dataset '{}'", weather_path.display());
        let weather = read_regional_dataset(weather_path)?;
        info!("opening capacity factors '{}'", capfacts_path.display());
        let capfacts = read_capfacts(capfacts_path)?;
        Ok(Self::from_parts(capfacts, weather))
    }

    pub fn from_parts(capfacts: DataFrame, weather: RegionalDataset) -> Self {
        Self { capfacts, weather }
    }

    /// The snapshot index column, as text.
    pub fn snapshots(&self) -> Result<Vec<String>> {
        let series = self
            .capfacts
            .column("snapshot")
            .context("capacity-factor table is missing a 'snapshot' column")?
            .cast(&DataType::Utf8)?;
        let values = series.utf8()?;
        (0..values.len())
            .map(|row| {
                values
                    .get(row)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("null snapshot at row {row}"))
            })
            .collect()
    }

    /// All capacity-factor column names, in table order (snapshot column
    /// excluded).
    pub fn columns(&self) -> Vec<String> {
        self.capfacts
            .get_column_names()
            .iter()
            .filter(|name| **name != "snapshot")
            .map(|name| name.to_string())
            .collect()
    }

    /// Column names containing `pattern`, e.g. all columns of one
    /// country abbreviation.
    pub fn find_columns(&self, pattern: &str) -> Vec<String> {
        self.columns()
            .into_iter()
            .filter(|name| name.contains(pattern))
            .collect()
    }

    pub fn n_timesteps(&self) -> usize {
        self.weather.n_times()
    }

    /// Assemble the target series and stacked feature matrix for one
    /// capacity-factor column. Feature columns follow the declared order
    /// of the energy type's feature set.
    pub fn training_data(&self, column: &str) -> CapforResult<(Vec<f64>, FeatureMatrix)> {
        let (region, energy) = parse_capfac_column(column)
            .ok_or_else(|| CapforError::UnparseableColumn(column.to_string()))?;
        let features = feature_set(energy)
            .ok_or_else(|| CapforError::UnknownEnergyType(column.to_string()))?;
        if features.is_empty() {
            return Err(CapforError::Other(format!(
                "energy type '{}' has no weather features",
                energy.as_str()
            )));
        }

        let key = region_key(&region, energy);
        let y = self.column_values(column)?;
        let n_times = self.weather.n_times();
        if y.len() != n_times {
            return Err(CapforError::ShapeMismatch {
                expected: n_times,
                got: y.len(),
            });
        }

        let columns: Vec<Vec<f64>> = features
            .iter()
            .map(|&feature| {
                self.weather
                    .feature_series(&key, feature)
                    .map(<[f64]>::to_vec)
            })
            .collect::<CapforResult<_>>()?;
        let x = FeatureMatrix::from_columns(&columns)?;
        Ok((y, x))
    }

    fn column_values(&self, column: &str) -> CapforResult<Vec<f64>> {
        let series = self
            .capfacts
            .column(column)
            .map_err(|e| CapforError::Parse(format!("column '{column}': {e}")))?
            .cast(&DataType::Float64)
            .map_err(|e| CapforError::Parse(format!("column '{column}' is not numeric: {e}")))?;
        let values = series
            .f64()
            .map_err(|e| CapforError::Parse(e.to_string()))?;
        (0..values.len())
            .map(|row| {
                values.get(row).ok_or_else(|| {
                    CapforError::Parse(format!("null value in column '{column}' at row {row}"))
                })
            })
            .collect()
    }
}

fn read_capfacts(path: &Path) -> Result<DataFrame> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    CsvReader::new(&mut file)
        .has_header(true)
        .finish()
        .with_context(|| format!("reading capacity factors from {}", path.display()))
}
