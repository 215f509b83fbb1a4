//! In-memory form of the gridded weather dataset.
//!
//! The on-disk layout is long format: one row per (grid point, timestep)
//! with `x`, `y`, `time` and one column per weather channel. Points keep
//! their first-occurrence order from the file, which fixes the scan order
//! of the point-in-polygon pass.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use polars::prelude::*;

use capfor_core::{Feature, ALL_FEATURES};

use crate::geometry::GridPoint;
use crate::store::read_frame;

#[derive(Debug)]
pub struct WeatherGrid {
    points: Vec<GridPoint>,
    times: Vec<String>,
    /// One block per channel in [`ALL_FEATURES`] order, each laid out
    /// `[point * n_times + t]`.
    channels: Vec<Vec<f64>>,
}

impl WeatherGrid {
    /// Load a long-format weather grid from CSV or Parquet. Fails if any
    /// (point, timestep) cell is missing or duplicated.
    pub fn load(path: &Path) -> Result<Self> {
        let df = read_frame(path)?;
        let xs = float_column(&df, "x")?;
        let ys = float_column(&df, "y")?;
        let time_series = df
            .column("time")
            .context("weather grid is missing a 'time' column")?;
        let time_values = time_series.utf8().context("'time' column must be text")?;

        let n_rows = df.height();
        let mut points = Vec::new();
        let mut point_index: HashMap<(u64, u64), usize> = HashMap::new();
        let mut times = Vec::new();
        let mut time_index: HashMap<String, usize> = HashMap::new();

        for row in 0..n_rows {
            let (x, y) = (cell(&xs, row, "x")?, cell(&ys, row, "y")?);
            point_index.entry((x.to_bits(), y.to_bits())).or_insert_with(|| {
                points.push(GridPoint { x, y });
                points.len() - 1
            });
            let time = time_values
                .get(row)
                .ok_or_else(|| anyhow!("null 'time' value at row {row}"))?;
            if !time_index.contains_key(time) {
                time_index.insert(time.to_string(), times.len());
                times.push(time.to_string());
            }
        }

        let n_points = points.len();
        let n_times = times.len();
        if n_rows != n_points * n_times {
            return Err(anyhow!(
                "weather grid is not rectangular: {n_rows} rows for {n_points} points x {n_times} timesteps"
            ));
        }

        let mut channels = Vec::with_capacity(ALL_FEATURES.len());
        for feature in ALL_FEATURES {
            let series = float_column(&df, feature.column())?;
            let mut block = vec![f64::NAN; n_points * n_times];
            for row in 0..n_rows {
                let x = cell(&xs, row, "x")?;
                let y = cell(&ys, row, "y")?;
                let point = point_index[&(x.to_bits(), y.to_bits())];
                let time = time_values
                    .get(row)
                    .ok_or_else(|| anyhow!("null 'time' value at row {row}"))?;
                let t = time_index[time];
                let slot = &mut block[point * n_times + t];
                if !slot.is_nan() {
                    return Err(anyhow!(
                        "duplicate weather sample for point ({x}, {y}) at time '{time}'"
                    ));
                }
                *slot = cell(&series, row, feature.column())?;
            }
            channels.push(block);
        }

        Ok(Self {
            points,
            times,
            channels,
        })
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn times(&self) -> &[String] {
        &self.times
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn value(&self, feature: Feature, point: usize, t: usize) -> f64 {
        self.channels[feature.index()][point * self.n_times() + t]
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        points: Vec<GridPoint>,
        times: Vec<String>,
        channels: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            points,
            times,
            channels,
        }
    }
}

fn float_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df
        .column(name)
        .with_context(|| format!("weather grid is missing the '{name}' column"))?
        .cast(&DataType::Float64)
        .with_context(|| format!("casting column '{name}' to Float64"))?;
    Ok(series.f64()?.clone())
}

fn cell(series: &Float64Chunked, row: usize, name: &str) -> Result<f64> {
    series
        .get(row)
        .ok_or_else(|| anyhow!("null '{name}' value at row {row}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_sample_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let header = "x,y,time,height,wnd100m,roughness,influx_toa,influx_direct,influx_diffuse,albedo,temperature,soil_temperature,runoff";
        writeln!(file, "{header}").unwrap();
        for (p, (x, y)) in [(0.5, 0.5), (1.5, 0.5)].iter().enumerate() {
            for t in 0..3 {
                let v = (p * 10 + t) as f64;
                writeln!(
                    file,
                    "{x},{y},t{t},100.0,{v},0.1,{v},{v},{v},0.2,{v},{v},0.0"
                )
                .unwrap();
            }
        }
        file
    }

    #[test]
    fn loads_rectangular_grid() {
        let file = write_sample_csv();
        let grid = WeatherGrid::load(file.path()).unwrap();
        assert_eq!(grid.points().len(), 2);
        assert_eq!(grid.n_times(), 3);
        assert_eq!(grid.times(), &["t0", "t1", "t2"]);
        assert_eq!(grid.value(Feature::Wnd100m, 0, 1), 1.0);
        assert_eq!(grid.value(Feature::Wnd100m, 1, 2), 12.0);
        assert_eq!(grid.value(Feature::Height, 1, 0), 100.0);
    }

    #[test]
    fn ragged_grid_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        let header = "x,y,time,height,wnd100m,roughness,influx_toa,influx_direct,influx_diffuse,albedo,temperature,soil_temperature,runoff";
        writeln!(file, "{header}").unwrap();
        writeln!(file, "0.5,0.5,t0,1,1,1,1,1,1,1,1,1,1").unwrap();
        writeln!(file, "0.5,0.5,t1,1,1,1,1,1,1,1,1,1,1").unwrap();
        writeln!(file, "1.5,0.5,t0,1,1,1,1,1,1,1,1,1,1").unwrap();
        let err = WeatherGrid::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("not rectangular"));
    }
}
