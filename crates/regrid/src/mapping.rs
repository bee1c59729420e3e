//! Destination-to-source cell correspondences.
//!
//! A [`GridMapping`] holds, for every destination cell (row-major), the list
//! of source cells that contribute to it and their weights. Mappings depend
//! only on the two grids, so they are built once per domain and reused for
//! every species and time step.

use cmaq_common::{BoundingBox, CurvilinearGrid};
use geo::Area;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{intersection_area, polygon_bbox, to_polygon, to_rect};
use crate::latlon::RegularLatLonGrid;
use crate::nearest::{nearest_index, NearestMatch};
use crate::Result;

/// What an area weight is a fraction of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightBasis {
    /// Fraction of the source cell covered by the destination cell.
    ///
    /// Used to redistribute extensive quantities (fluxes per cell) so that
    /// each source cell's total is conserved.
    SourceArea,
    /// Fraction of the destination cell covered by the source cell.
    ///
    /// Used to average intensive quantities (fluxes per unit area).
    DestinationArea,
    /// Nearest-neighbour match, weight 1.
    Nearest,
}

/// One contributing source cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedIndex {
    /// Flat row-major index into the source grid.
    pub source: usize,
    pub weight: f64,
}

/// Area weights of one destination polygon against a regular lat/lon grid.
///
/// Only source cells with a non-empty intersection are returned. A polygon
/// entirely outside the source grid yields an empty list.
pub fn area_weights(
    dest_polygon: &[(f64, f64)],
    source: &RegularLatLonGrid,
    basis: WeightBasis,
) -> Vec<WeightedIndex> {
    if dest_polygon.len() < 3 {
        return Vec::new();
    }
    let polygon = to_polygon(dest_polygon);
    let Some(bbox) = polygon_bbox(&polygon) else {
        return Vec::new();
    };
    let dest_area = polygon.unsigned_area();
    let (rows, cols) = source.candidates(&bbox);

    let mut weights = Vec::new();
    for ix in cols {
        for iy in rows.clone() {
            let cell: BoundingBox = source.cell_box(iy, ix);
            if !cell.intersects(&bbox) {
                continue;
            }
            let overlap = intersection_area(&polygon, &to_rect(&cell));
            if overlap <= 0.0 {
                continue;
            }
            let weight = match basis {
                WeightBasis::SourceArea => overlap / cell.area(),
                WeightBasis::DestinationArea => overlap / dest_area,
                WeightBasis::Nearest => 1.0,
            };
            weights.push(WeightedIndex {
                source: source.flat_index(iy, ix),
                weight,
            });
        }
    }
    weights
}

/// Cached correspondence from every destination cell to its source cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMapping {
    basis: WeightBasis,
    dest_rows: usize,
    dest_cols: usize,
    entries: Vec<Vec<WeightedIndex>>,
}

impl GridMapping {
    /// Area-weighted mapping from the cell footprints of `dest` onto `source`.
    ///
    /// `dest` must carry corner (dot-point) coordinates.
    pub fn area_weighted(
        dest: &CurvilinearGrid,
        source: &RegularLatLonGrid,
        basis: WeightBasis,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(dest.len());
        for row in 0..dest.rows() {
            for col in 0..dest.cols() {
                let polygon = dest.cell_polygon(row, col)?;
                entries.push(area_weights(&polygon, source, basis));
            }
        }
        let mapping = Self {
            basis,
            dest_rows: dest.rows(),
            dest_cols: dest.cols(),
            entries,
        };
        debug!(
            rows = mapping.dest_rows,
            cols = mapping.dest_cols,
            overlaps = mapping.overlap_count(),
            "Built area-weight mapping"
        );
        Ok(mapping)
    }

    /// Nearest-neighbour mapping from the cell centres of `dest` onto `source`.
    pub fn nearest(dest: &CurvilinearGrid, source: &CurvilinearGrid) -> Self {
        let entries = dest
            .lat_values()
            .iter()
            .zip(dest.lon_values())
            .map(|(&lat, &lon)| {
                let m: NearestMatch = nearest_index(lat, lon, source);
                vec![WeightedIndex {
                    source: m.row * source.cols() + m.col,
                    weight: 1.0,
                }]
            })
            .collect();
        Self {
            basis: WeightBasis::Nearest,
            dest_rows: dest.rows(),
            dest_cols: dest.cols(),
            entries,
        }
    }

    pub fn basis(&self) -> WeightBasis {
        self.basis
    }

    pub fn dest_rows(&self) -> usize {
        self.dest_rows
    }

    pub fn dest_cols(&self) -> usize {
        self.dest_cols
    }

    /// Contributors of destination cell `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> &[WeightedIndex] {
        &self.entries[row * self.dest_cols + col]
    }

    /// Iterate `(row, col, contributors)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &[WeightedIndex])> + '_ {
        let cols = self.dest_cols;
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, e)| (i / cols, i % cols, e.as_slice()))
    }

    /// Total number of (destination, source) pairs.
    pub fn overlap_count(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    /// Apply the mapping to a row-major source field.
    pub fn apply(&self, source: &[f64]) -> Vec<f64> {
        self.entries
            .iter()
            .map(|e| e.iter().map(|w| source[w.source] * w.weight).sum())
            .collect()
    }
}
