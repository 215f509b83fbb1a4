//! Region aggregation stage: reduces the gridded weather dataset to
//! per-region averaged series and persists them for the forecasting
//! stage.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use capfor_core::{CapforConfig, CapforError};

pub mod aggregate;
pub mod geojson;
pub mod geometry;
pub mod grid;
pub mod store;

pub use aggregate::{assign_points_to_regions, build_regional_series, RegionalDataset};
pub use geojson::load_region_shapes;
pub use geometry::{GridPoint, Polygon, RegionShape};
pub use grid::WeatherGrid;
pub use store::{read_regional_dataset, write_regional_dataset};

fn require_file(path: &Path, hint: &str) -> Result<(), CapforError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CapforError::MissingInputFile {
            path: path.to_path_buf(),
            hint: hint.to_string(),
        })
    }
}

/// Build and persist the regional weather dataset if it does not exist
/// yet. Returns `false` when the file was already present and nothing was
/// done. The existence check is the idempotency guard; concurrent writers
/// are a documented precondition violation.
///
/// Required inputs are checked up front so a missing file is reported
/// before the expensive point-in-polygon pass starts.
pub fn build_regional_dataset(config: &CapforConfig) -> Result<bool> {
    let target = &config.paths.regional_weather;
    if target.is_file() {
        info!(
            "regional weather dataset '{}' already exists, skipping aggregation",
            target.display()
        );
        return Ok(false);
    }

    require_file(
        &config.paths.weather_grid,
        "Provide the gridded weather export (long-format CSV/Parquet with x, y, time and one column per channel).",
    )?;
    require_file(
        &config.paths.onshore_regions,
        "Provide the onshore region polygons as a GeoJSON FeatureCollection.",
    )?;
    require_file(
        &config.paths.offshore_regions,
        "Provide the offshore region polygons as a GeoJSON FeatureCollection.",
    )?;

    info!(
        "loading weather grid from '{}'",
        config.paths.weather_grid.display()
    );
    let grid = WeatherGrid::load(&config.paths.weather_grid)?;
    let onshore = load_region_shapes(&config.paths.onshore_regions)?;
    let offshore = load_region_shapes(&config.paths.offshore_regions)?;

    let dataset = build_regional_series(&grid, &onshore, &offshore)?;
    write_regional_dataset(target, &dataset)?;
    info!(
        "wrote regional weather dataset for {} regions x {} timesteps to '{}'",
        dataset.regions().len(),
        dataset.n_times(),
        target.display()
    );
    Ok(true)
}
