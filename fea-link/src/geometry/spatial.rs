//! Spatial index for tolerance-based point deduplication.
//!
//! Space is divided into cubic cells whose side equals the merge tolerance, so
//! every point within tolerance of a query lies in the 3x3x3 block of cells
//! around it. Lookups are O(1) on average.

use std::ops::RangeInclusive;

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use crate::error::{LinkError, LinkResult};

type Cell = (i64, i64, i64);

/// Insert-or-find index over 3D points.
///
/// Indices are dense and assigned in insertion order. When several stored
/// points lie within tolerance of a query, the first-inserted one wins.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tolerance: f64,
    points: Vec<Point3<f64>>,
    grid: FxHashMap<Cell, Vec<usize>>,
}

impl SpatialIndex {
    /// Creates an empty index; `tolerance` must be finite and positive
    pub fn new(tolerance: f64) -> LinkResult<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(LinkError::InvalidInput(format!(
                "merge tolerance must be a positive finite number, got {tolerance}"
            )));
        }
        Ok(Self {
            tolerance,
            points: Vec::new(),
            grid: FxHashMap::default(),
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns the index of a stored point within tolerance of `point`, or
    /// stores `point` and returns its new index.
    pub fn insert_or_find(&mut self, point: Point3<f64>) -> usize {
        if let Some(index) = self.find(&point) {
            return index;
        }
        let index = self.points.len();
        self.points.push(point);
        self.grid.entry(self.cell_of(&point)).or_default().push(index);
        index
    }

    /// Finds the first-inserted stored point within tolerance of `point`
    pub fn find(&self, point: &Point3<f64>) -> Option<usize> {
        let (cx, cy, cz) = self.cell_of(point);
        let tol_sq = self.tolerance * self.tolerance;
        let mut best: Option<usize> = None;

        for x in around(cx) {
            for y in around(cy) {
                for z in around(cz) {
                    let Some(candidates) = self.grid.get(&(x, y, z)) else {
                        continue;
                    };
                    // Each cell list is in insertion order, so its first hit is its earliest
                    let hit = candidates
                        .iter()
                        .copied()
                        .find(|&i| (self.points[i] - point).norm_squared() <= tol_sq);
                    if let Some(i) = hit {
                        best = Some(best.map_or(i, |b| b.min(i)));
                    }
                }
            }
        }

        best
    }

    pub fn point(&self, index: usize) -> Option<&Point3<f64>> {
        self.points.get(index)
    }

    /// Stored points in index order
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cell coordinates saturate at the `i64` range; the neighbour range in
    /// [`around`] saturates the same way, so far points still find each other
    fn cell_of(&self, p: &Point3<f64>) -> Cell {
        (
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        )
    }
}

/// A cell and its two neighbours along one axis, clipped to the `i64` range
fn around(c: i64) -> RangeInclusive<i64> {
    c.saturating_sub(1)..=c.saturating_add(1)
}
