//! Regular latitude/longitude source grids (e.g. GFAS fire emissions).
//!
//! Latitudes run north to south as in the GFAS files, longitudes west to
//! east. Row `iy` spans `lat_edges[iy]` (north) to `lat_edges[iy + 1]`
//! (south).

use std::ops::Range;

use cmaq_common::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::{RegridError, Result};

/// `(pi / 180) * R^2` with R = 6371 km, in km² per degree.
pub const SPHERICAL_AREA_COEF_KM2: f64 = 708_422.877_652_483_8;

/// Area of a lat/lon rectangle on the sphere in km².
pub fn spherical_rectangle_area_km2(lat1: f64, lat2: f64, lon1: f64, lon2: f64) -> f64 {
    SPHERICAL_AREA_COEF_KM2
        * (lat1.to_radians().sin() - lat2.to_radians().sin()).abs()
        * (lon1 - lon2).abs()
}

/// Area of a lat/lon rectangle on the sphere in m².
pub fn spherical_rectangle_area_m2(lat1: f64, lat2: f64, lon1: f64, lon2: f64) -> f64 {
    spherical_rectangle_area_km2(lat1, lat2, lon1, lon2) * 1.0e6
}

/// Index of the first element greater than `x` in an ascending slice.
pub fn bisect_right(sorted: &[f64], x: f64) -> usize {
    sorted.partition_point(|&v| v <= x)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// A regular lat/lon grid with precomputed cell edges and areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularLatLonGrid {
    lat: Vec<f64>,
    lon: Vec<f64>,
    lat_edges: Vec<f64>,
    lon_edges: Vec<f64>,
    /// Ascending copy of `lat_edges` for binary search.
    lat_edges_rev: Vec<f64>,
    /// Cell areas in m², row-major `(iy, ix)`.
    areas_m2: Vec<f64>,
}

impl RegularLatLonGrid {
    /// Build the grid from cell-centre axes.
    ///
    /// Centres are rounded to 1e-3 degrees and edges to 1e-2 degrees, which
    /// removes the float noise present in GFAS coordinate variables.
    pub fn from_centres(lat: &[f64], lon: &[f64]) -> Result<Self> {
        if lat.len() < 2 || lon.len() < 2 {
            return Err(RegridError::empty_grid(format!(
                "regular grid needs at least 2 points per axis, got {} x {}",
                lat.len(),
                lon.len()
            )));
        }
        let lat: Vec<f64> = lat.iter().map(|&v| round_to(v, 3)).collect();
        let lon: Vec<f64> = lon.iter().map(|&v| round_to(v, 3)).collect();

        if lat.windows(2).any(|w| w[1] >= w[0]) {
            return Err(RegridError::empty_grid(
                "latitudes must be strictly decreasing (north to south)",
            ));
        }
        if lon.windows(2).any(|w| w[1] <= w[0]) {
            return Err(RegridError::empty_grid(
                "longitudes must be strictly increasing",
            ));
        }

        let dlat = lat[0] - lat[1];
        let dlon = lon[1] - lon[0];

        let mut lon_edges: Vec<f64> = lon.iter().map(|&v| v - dlon / 2.0).collect();
        lon_edges.push(lon[lon.len() - 1] + dlon / 2.0);
        let lon_edges: Vec<f64> = lon_edges.into_iter().map(|v| round_to(v, 2)).collect();

        let mut lat_edges: Vec<f64> = lat.iter().map(|&v| v + dlat / 2.0).collect();
        lat_edges.push(lat[lat.len() - 1] - dlat / 2.0);
        let lat_edges: Vec<f64> = lat_edges.into_iter().map(|v| round_to(v, 2)).collect();

        let lat_edges_rev: Vec<f64> = lat_edges.iter().rev().copied().collect();

        let mut areas_m2 = Vec::with_capacity(lat.len() * lon.len());
        for iy in 0..lat.len() {
            for ix in 0..lon.len() {
                areas_m2.push(spherical_rectangle_area_m2(
                    lat_edges[iy],
                    lat_edges[iy + 1],
                    lon_edges[ix],
                    lon_edges[ix + 1],
                ));
            }
        }

        Ok(Self {
            lat,
            lon,
            lat_edges,
            lon_edges,
            lat_edges_rev,
            areas_m2,
        })
    }

    pub fn nlat(&self) -> usize {
        self.lat.len()
    }

    pub fn nlon(&self) -> usize {
        self.lon.len()
    }

    pub fn lat_edges(&self) -> &[f64] {
        &self.lat_edges
    }

    pub fn lon_edges(&self) -> &[f64] {
        &self.lon_edges
    }

    /// Flat row-major index of `(iy, ix)`.
    pub fn flat_index(&self, iy: usize, ix: usize) -> usize {
        iy * self.lon.len() + ix
    }

    /// Cell area in m².
    pub fn area_m2(&self, iy: usize, ix: usize) -> f64 {
        self.areas_m2[self.flat_index(iy, ix)]
    }

    /// All cell areas in m², row-major.
    pub fn areas_m2(&self) -> &[f64] {
        &self.areas_m2
    }

    /// Footprint of cell `(iy, ix)` in lon/lat degrees.
    pub fn cell_box(&self, iy: usize, ix: usize) -> BoundingBox {
        BoundingBox::new(
            self.lon_edges[ix],
            self.lat_edges[iy + 1],
            self.lon_edges[ix + 1],
            self.lat_edges[iy],
        )
    }

    /// Row and column ranges of cells that may overlap `bbox`.
    ///
    /// The column range is widened by one on the left; callers still test
    /// each candidate for an actual intersection.
    pub fn candidates(&self, bbox: &BoundingBox) -> (Range<usize>, Range<usize>) {
        let nlat = self.nlat() as isize;
        let nlon = self.nlon() as isize;

        let ixminl = bisect_right(&self.lon_edges, bbox.min_x) as isize;
        let ixmaxr = bisect_right(&self.lon_edges, bbox.max_x) as isize;
        let iyminl = nlat - bisect_right(&self.lat_edges_rev, bbox.max_y) as isize;
        let iymaxr = nlat - bisect_right(&self.lat_edges_rev, bbox.min_y) as isize;

        let ix0 = (ixminl - 1).max(0);
        let ix1 = ixmaxr.min(nlon).max(ix0);
        let iy0 = iyminl.max(0);
        let iy1 = (iymaxr + 1).min(nlat).max(iy0);

        (iy0 as usize..iy1 as usize, ix0 as usize..ix1 as usize)
    }
}
