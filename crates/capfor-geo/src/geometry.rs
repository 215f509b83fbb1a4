//! Planar geometry for assigning grid points to region polygons.
//!
//! All coordinates are in the grid's native projection; no reprojection
//! happens here. Containment uses even-odd ray casting, with rings after
//! the first of each polygon treated as holes.

/// A single sample location of the gridded weather dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

/// One polygon of a region: an exterior ring plus optional holes.
/// Rings may be open or closed; the cast treats the last vertex as
/// connected back to the first either way.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub exterior: Vec<GridPoint>,
    pub holes: Vec<Vec<GridPoint>>,
}

/// A named region: one or more polygons tagged by the file (onshore or
/// offshore) they came from.
#[derive(Debug, Clone)]
pub struct RegionShape {
    pub name: String,
    pub polygons: Vec<Polygon>,
}

fn ring_contains(ring: &[GridPoint], point: GridPoint) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

impl Polygon {
    pub fn contains(&self, point: GridPoint) -> bool {
        if !ring_contains(&self.exterior, point) {
            return false;
        }
        !self.holes.iter().any(|hole| ring_contains(hole, point))
    }
}

impl RegionShape {
    pub fn contains(&self, point: GridPoint) -> bool {
        self.polygons.iter().any(|polygon| polygon.contains(point))
    }
}
