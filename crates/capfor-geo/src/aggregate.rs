//! Reduction of the gridded weather dataset to per-region averages.
//!
//! Assignment policy: every grid point is tested against the onshore
//! polygons in file order and assigned to the FIRST region containing it,
//! then the scan stops for that point. The same first-match pass runs
//! independently over the offshore polygons, so a point can belong to one
//! onshore and one offshore region at the same time, or to neither.
//! Region polygons are assumed non-overlapping within each collection;
//! if they do overlap, the result is order-dependent on the polygon
//! enumeration. That is the defined tie-break, kept for compatibility
//! with prior results.

use std::collections::HashMap;

use tracing::{debug, info};

use capfor_core::{CapforError, CapforResult, Feature, Shore, ALL_FEATURES};

use crate::geometry::{GridPoint, RegionShape};
use crate::grid::WeatherGrid;

/// Per-region averaged weather series, keyed by the suffixed region name
/// (`"<name> on"` / `"<name> off"`). Every region has the same timestep
/// axis; every channel has one value per timestep.
#[derive(Debug)]
pub struct RegionalDataset {
    times: Vec<String>,
    regions: Vec<String>,
    index: HashMap<String, usize>,
    /// Per region, channel-major: `[feature.index() * n_times + t]`.
    values: Vec<Vec<f64>>,
}

impl RegionalDataset {
    pub fn new(times: Vec<String>) -> Self {
        Self {
            times,
            regions: Vec::new(),
            index: HashMap::new(),
            values: Vec::new(),
        }
    }

    pub fn push_region(&mut self, name: String, values: Vec<f64>) -> CapforResult<()> {
        if values.len() != ALL_FEATURES.len() * self.times.len() {
            return Err(CapforError::ShapeMismatch {
                expected: ALL_FEATURES.len() * self.times.len(),
                got: values.len(),
            });
        }
        if self.index.contains_key(&name) {
            return Err(CapforError::Other(format!("duplicate region '{name}'")));
        }
        self.index.insert(name.clone(), self.regions.len());
        self.regions.push(name);
        self.values.push(values);
        Ok(())
    }

    pub fn times(&self) -> &[String] {
        &self.times
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// The averaged series of one channel for one region.
    pub fn feature_series(&self, region: &str, feature: Feature) -> CapforResult<&[f64]> {
        let idx = self.index.get(region).ok_or_else(|| {
            CapforError::Other(format!("region '{region}' not found in regional dataset"))
        })?;
        let n = self.n_times();
        let start = feature.index() * n;
        Ok(&self.values[*idx][start..start + n])
    }
}

/// First-match point assignment against one shape collection. Returns,
/// per shape, the indices of the grid points inside it.
pub fn assign_points_to_regions(
    points: &[GridPoint],
    shapes: &[RegionShape],
) -> Vec<Vec<usize>> {
    let mut assignments: Vec<Vec<usize>> = vec![Vec::new(); shapes.len()];
    for (i, point) in points.iter().enumerate() {
        if (i + 1) % 1000 == 0 {
            debug!("classified {} of {} grid points", i + 1, points.len());
        }
        for (shape_idx, shape) in shapes.iter().enumerate() {
            if shape.contains(*point) {
                assignments[shape_idx].push(i);
                break;
            }
        }
    }
    assignments
}

/// Average all assigned grid points per region and channel. A region with
/// zero assigned points is a fatal configuration error: averaging over it
/// would divide by zero and the output would be structurally invalid.
pub fn build_regional_series(
    grid: &WeatherGrid,
    onshore: &[RegionShape],
    offshore: &[RegionShape],
) -> CapforResult<RegionalDataset> {
    info!(
        "mapping {} grid points to {} onshore and {} offshore regions",
        grid.points().len(),
        onshore.len(),
        offshore.len()
    );
    let assignments_on = assign_points_to_regions(grid.points(), onshore);
    let assignments_off = assign_points_to_regions(grid.points(), offshore);

    let mut dataset = RegionalDataset::new(grid.times().to_vec());
    let tagged = onshore
        .iter()
        .zip(&assignments_on)
        .map(|(shape, points)| (shape, points, Shore::On))
        .chain(
            offshore
                .iter()
                .zip(&assignments_off)
                .map(|(shape, points)| (shape, points, Shore::Off)),
        );

    for (shape, assigned, shore) in tagged {
        let name = format!("{}{}", shape.name, shore.suffix());
        if assigned.is_empty() {
            return Err(CapforError::EmptyRegionAssignment { region: name });
        }
        info!("averaging region '{}' ({} points)", name, assigned.len());
        dataset.push_region(name, average_region(grid, assigned))?;
    }
    Ok(dataset)
}

fn average_region(grid: &WeatherGrid, assigned: &[usize]) -> Vec<f64> {
    let n_times = grid.n_times();
    let n_points = assigned.len() as f64;
    let mut values = vec![0.0; ALL_FEATURES.len() * n_times];
    for feature in ALL_FEATURES {
        let block = &mut values[feature.index() * n_times..(feature.index() + 1) * n_times];
        if feature == Feature::Height {
            // Height is spatial-only; average it once and broadcast the
            // scalar across all timesteps for uniform shape.
            let mut total = 0.0;
            for &point in assigned {
                for t in 0..n_times {
                    total += grid.value(feature, point, t);
                }
            }
            let scalar = total / (n_points * n_times as f64);
            block.fill(scalar);
        } else {
            for (t, slot) in block.iter_mut().enumerate() {
                let sum: f64 = assigned
                    .iter()
                    .map(|&point| grid.value(feature, point, t))
                    .sum();
                *slot = sum / n_points;
            }
        }
    }
    values
}
