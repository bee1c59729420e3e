//! Curvilinear grid descriptions for CMAQ and host-model domains.
//!
//! All 2D arrays are stored row-major (`row * cols + col`), row 0 being the
//! southernmost row as in the MCIP `GRIDCRO2D`/`GRIDDOT2D` files.

use crate::{PrepError, PrepResult};
use serde::{Deserialize, Serialize};

/// Cell size in projection units (metres for Lambert CMAQ grids).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellGeometry {
    pub xcell: f64,
    pub ycell: f64,
}

impl CellGeometry {
    pub fn new(xcell: f64, ycell: f64) -> PrepResult<Self> {
        if !(xcell > 0.0 && ycell > 0.0) {
            return Err(PrepError::InvalidCellSize { xcell, ycell });
        }
        Ok(Self { xcell, ycell })
    }

    /// Cell area in m².
    pub fn area_m2(&self) -> f64 {
        self.xcell * self.ycell
    }

    /// Cell area in km².
    pub fn area_km2(&self) -> f64 {
        self.area_m2() / 1.0e6
    }
}

/// A set of points, e.g. the perimeter cells of a boundary file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl PointSet {
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> PrepResult<Self> {
        if lat.len() != lon.len() {
            return Err(PrepError::shape_mismatch("point longitudes", lat.len(), lon.len()));
        }
        Ok(Self { lat, lon })
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lat.iter().copied().zip(self.lon.iter().copied())
    }
}

/// Cell centres plus optional cell corners of a 2D curvilinear grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvilinearGrid {
    rows: usize,
    cols: usize,
    lat: Vec<f64>,
    lon: Vec<f64>,
    /// Dot-point latitudes, `(rows + 1) x (cols + 1)`.
    corner_lat: Option<Vec<f64>>,
    /// Dot-point longitudes, `(rows + 1) x (cols + 1)`.
    corner_lon: Option<Vec<f64>>,
}

impl CurvilinearGrid {
    /// Create a grid from cell-centre arrays.
    pub fn new(rows: usize, cols: usize, lat: Vec<f64>, lon: Vec<f64>) -> PrepResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(PrepError::Empty { rows, cols });
        }
        let n = rows * cols;
        if lat.len() != n {
            return Err(PrepError::shape_mismatch("cell-centre latitudes", n, lat.len()));
        }
        if lon.len() != n {
            return Err(PrepError::shape_mismatch("cell-centre longitudes", n, lon.len()));
        }
        Ok(Self {
            rows,
            cols,
            lat,
            lon,
            corner_lat: None,
            corner_lon: None,
        })
    }

    /// Attach cell-corner arrays of shape `(rows + 1) x (cols + 1)`.
    pub fn with_corners(mut self, corner_lat: Vec<f64>, corner_lon: Vec<f64>) -> PrepResult<Self> {
        let n = (self.rows + 1) * (self.cols + 1);
        if corner_lat.len() != n {
            return Err(PrepError::shape_mismatch("corner latitudes", n, corner_lat.len()));
        }
        if corner_lon.len() != n {
            return Err(PrepError::shape_mismatch("corner longitudes", n, corner_lon.len()));
        }
        self.corner_lat = Some(corner_lat);
        self.corner_lon = Some(corner_lon);
        Ok(self)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lat_values(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon_values(&self) -> &[f64] {
        &self.lon
    }

    /// Cell-centre latitude of `(row, col)`.
    pub fn lat(&self, row: usize, col: usize) -> f64 {
        self.lat[row * self.cols + col]
    }

    /// Cell-centre longitude of `(row, col)`.
    pub fn lon(&self, row: usize, col: usize) -> f64 {
        self.lon[row * self.cols + col]
    }

    pub fn has_corners(&self) -> bool {
        self.corner_lat.is_some() && self.corner_lon.is_some()
    }

    /// Dot-point `(lat, lon)` at corner index `(row, col)`, both up to and including `rows`/`cols`.
    pub fn corner(&self, row: usize, col: usize) -> PrepResult<(f64, f64)> {
        match (&self.corner_lat, &self.corner_lon) {
            (Some(lat), Some(lon)) => {
                let idx = row * (self.cols + 1) + col;
                Ok((lat[idx], lon[idx]))
            }
            _ => Err(PrepError::MissingCorners),
        }
    }

    /// Footprint of cell `(row, col)` as `(lon, lat)` vertices.
    ///
    /// Vertices are ordered (row, col), (row, col+1), (row+1, col+1), (row+1, col).
    pub fn cell_polygon(&self, row: usize, col: usize) -> PrepResult<[(f64, f64); 4]> {
        let corners = [
            self.corner(row, col)?,
            self.corner(row, col + 1)?,
            self.corner(row + 1, col + 1)?,
            self.corner(row + 1, col)?,
        ];
        Ok(corners.map(|(lat, lon)| (lon, lat)))
    }

    /// Extract a rectangular window of cell centres.
    pub fn window(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> PrepResult<Self> {
        if row0 + rows > self.rows || col0 + cols > self.cols {
            return Err(PrepError::WindowOutOfBounds {
                row0,
                col0,
                rows,
                cols,
                grid_rows: self.rows,
                grid_cols: self.cols,
            });
        }
        let mut lat = Vec::with_capacity(rows * cols);
        let mut lon = Vec::with_capacity(rows * cols);
        for r in row0..row0 + rows {
            let start = r * self.cols + col0;
            lat.extend_from_slice(&self.lat[start..start + cols]);
            lon.extend_from_slice(&self.lon[start..start + cols]);
        }
        Self::new(rows, cols, lat, lon)
    }
}
