//! Minimal GeoJSON reader for region polygon files.
//!
//! Each file is a FeatureCollection whose features carry a `name`
//! property and a `Polygon` or `MultiPolygon` geometry in the same
//! coordinate reference system as the weather grid.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::geometry::{GridPoint, Polygon, RegionShape};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Properties {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

fn ring_points(ring: &[[f64; 2]]) -> Vec<GridPoint> {
    ring.iter()
        .map(|&[x, y]| GridPoint { x, y })
        .collect()
}

fn polygon_from_rings(rings: &[Vec<[f64; 2]>]) -> Polygon {
    let exterior = rings.first().map(|r| ring_points(r)).unwrap_or_default();
    let holes = rings.iter().skip(1).map(|r| ring_points(r)).collect();
    Polygon { exterior, holes }
}

impl Geometry {
    fn into_polygons(self) -> Vec<Polygon> {
        match self {
            Geometry::Polygon { coordinates } => vec![polygon_from_rings(&coordinates)],
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().map(|p| polygon_from_rings(p)).collect()
            }
        }
    }
}

/// Load the region shapes of one polygon file, in file order. The order
/// matters downstream: point assignment is first-match over this
/// enumeration.
pub fn load_region_shapes(path: &Path) -> Result<Vec<RegionShape>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading region file '{}'", path.display()))?;
    let collection: FeatureCollection = serde_json::from_str(&raw)
        .with_context(|| format!("parsing GeoJSON in '{}'", path.display()))?;
    Ok(collection
        .features
        .into_iter()
        .map(|feature| RegionShape {
            name: feature.properties.name,
            polygons: feature.geometry.into_polygons(),
        })
        .collect())
}
