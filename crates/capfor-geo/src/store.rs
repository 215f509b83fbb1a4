//! Persistence of the regional weather dataset.
//!
//! The dataset is stored long format, keyed by (`region`, `time`) with one
//! column per channel. Format is chosen by file extension: `.csv` always,
//! `.parquet` behind the `parquet` feature.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use polars::prelude::*;

use capfor_core::ALL_FEATURES;

use crate::aggregate::RegionalDataset;

pub(crate) fn read_frame(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    match extension.as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => ParquetReader::new(&mut file)
            .finish()
            .context("reading Parquet file"),
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(anyhow!(
            "parquet support is disabled; rebuild with the 'parquet' feature"
        )),
        "csv" => CsvReader::new(&mut file)
            .has_header(true)
            .finish()
            .context("reading CSV file"),
        _ => Err(anyhow!(
            "unsupported file extension '{}'; use .csv or .parquet",
            extension
        )),
    }
}

pub(crate) fn write_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
    {
        #[cfg(feature = "parquet")]
        Some(ext) if ext == "parquet" => ParquetWriter::new(&mut file)
            .finish(df)
            .map(|_| ())
            .context("writing Parquet file"),
        #[cfg(not(feature = "parquet"))]
        Some(ext) if ext == "parquet" => Err(anyhow!(
            "parquet support is disabled; rebuild with the 'parquet' feature"
        )),
        Some(ext) if ext == "csv" => CsvWriter::new(&mut file)
            .finish(df)
            .context("writing CSV file"),
        _ => Err(anyhow!(
            "unsupported output extension for {}; use .csv or .parquet",
            path.display()
        )),
    }
}

pub fn write_regional_dataset(path: &Path, dataset: &RegionalDataset) -> Result<()> {
    let n_times = dataset.n_times();
    let n_rows = dataset.regions().len() * n_times;

    let mut region_col = Vec::with_capacity(n_rows);
    let mut time_col = Vec::with_capacity(n_rows);
    for region in dataset.regions() {
        for time in dataset.times() {
            region_col.push(region.clone());
            time_col.push(time.clone());
        }
    }

    let mut columns = vec![
        Series::new("region", region_col),
        Series::new("time", time_col),
    ];
    for feature in ALL_FEATURES {
        let mut values = Vec::with_capacity(n_rows);
        for region in dataset.regions() {
            values.extend_from_slice(dataset.feature_series(region, feature)?);
        }
        columns.push(Series::new(feature.column(), values));
    }

    let mut df = DataFrame::new(columns)?;
    write_frame(&mut df, path)
}

pub fn read_regional_dataset(path: &Path) -> Result<RegionalDataset> {
    let df = read_frame(path)?;
    let region_series = df
        .column("region")
        .context("regional dataset is missing a 'region' column")?;
    let regions = region_series
        .utf8()
        .context("'region' column must be text")?;
    let time_series = df
        .column("time")
        .context("regional dataset is missing a 'time' column")?;
    let time_values = time_series.utf8().context("'time' column must be text")?;

    let mut times = Vec::new();
    let mut time_index: HashMap<String, usize> = HashMap::new();
    let mut region_order = Vec::new();
    let mut region_rows: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..df.height() {
        let region = regions
            .get(row)
            .ok_or_else(|| anyhow!("null 'region' value at row {row}"))?;
        let time = time_values
            .get(row)
            .ok_or_else(|| anyhow!("null 'time' value at row {row}"))?;
        if !time_index.contains_key(time) {
            time_index.insert(time.to_string(), times.len());
            times.push(time.to_string());
        }
        region_rows
            .entry(region.to_string())
            .or_insert_with(|| {
                region_order.push(region.to_string());
                Vec::new()
            })
            .push(row);
    }

    let n_times = times.len();
    let mut channels = Vec::with_capacity(ALL_FEATURES.len());
    for feature in ALL_FEATURES {
        let series = df
            .column(feature.column())
            .with_context(|| format!("regional dataset is missing '{}'", feature.column()))?
            .cast(&DataType::Float64)?;
        channels.push(series.f64()?.clone());
    }

    let mut dataset = RegionalDataset::new(times.clone());
    for region in region_order {
        let rows = &region_rows[&region];
        if rows.len() != n_times {
            return Err(anyhow!(
                "region '{region}' has {} rows but {n_times} timesteps",
                rows.len()
            ));
        }
        let mut values = vec![f64::NAN; ALL_FEATURES.len() * n_times];
        let mut seen = vec![false; n_times];
        for &row in rows {
            let time = time_values
                .get(row)
                .ok_or_else(|| anyhow!("null 'time' value at row {row}"))?;
            let t = time_index[time];
            if seen[t] {
                return Err(anyhow!(
                    "duplicate row for region '{region}' at time '{time}'"
                ));
            }
            seen[t] = true;
            for feature in ALL_FEATURES {
                values[feature.index() * n_times + t] =
                    channels[feature.index()].get(row).ok_or_else(|| {
                        anyhow!("null '{}' value at row {row}", feature.column())
                    })?;
            }
        }
        if let Some(t) = seen.iter().position(|filled| !filled) {
            return Err(anyhow!(
                "region '{region}' is missing time '{}'",
                times[t]
            ));
        }
        dataset.push_region(region, values)?;
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capfor_core::Feature;

    fn sample_dataset() -> RegionalDataset {
        let mut dataset = RegionalDataset::new(vec!["t0".into(), "t1".into()]);
        for (name, offset) in [("DE0 on", 0.0), ("DE0 off", 10.0)] {
            let mut values = Vec::new();
            for feature in ALL_FEATURES {
                values.push(offset + feature.index() as f64);
                values.push(offset + feature.index() as f64 + 0.5);
            }
            dataset.push_region(name.to_string(), values).unwrap();
        }
        dataset
    }

    #[test]
    fn csv_round_trip_preserves_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather-regions.csv");
        let dataset = sample_dataset();
        write_regional_dataset(&path, &dataset).unwrap();

        let restored = read_regional_dataset(&path).unwrap();
        assert_eq!(restored.regions(), dataset.regions());
        assert_eq!(restored.times(), dataset.times());
        assert_eq!(
            restored.feature_series("DE0 off", Feature::Wnd100m).unwrap(),
            dataset.feature_series("DE0 off", Feature::Wnd100m).unwrap()
        );
    }

    #[test]
    fn duplicated_time_row_is_rejected() {
        // A duplicate (region, time) row hides a missing timestep from the
        // per-region row count; it must error, never load as NaN.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather-regions.csv");
        write_regional_dataset(&path, &sample_dataset()).unwrap();

        let table = std::fs::read_to_string(&path).unwrap();
        let broken = table.replacen("DE0 on,t1", "DE0 on,t0", 1);
        assert_ne!(table, broken);
        std::fs::write(&path, broken).unwrap();

        let err = read_regional_dataset(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate row"));
        assert!(err.to_string().contains("DE0 on"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather-regions.nc");
        let err = write_regional_dataset(&path, &sample_dataset()).unwrap_err();
        assert!(err.to_string().contains("unsupported output extension"));
    }
}
