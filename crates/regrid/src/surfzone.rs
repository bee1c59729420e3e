//! Open-ocean and surf-zone fractions of CMAQ cells for the sea-salt module.
//!
//! The surf zone is a thin buffer around every land polygon that touches
//! the domain, less the land itself. Open ocean is the domain outline
//! widened by [`OCEAN_MARGIN_DEG`] with every touching land polygon removed.
//! Both are reported as the fraction of each cell's lon/lat footprint they
//! cover.

use cmaq_common::CurvilinearGrid;
use geo::{Area, BooleanOps, Buffer, Intersects, MultiPolygon};
use tracing::debug;

use crate::coastline::Coastline;
use crate::geometry::{overlap_area, to_polygon};
use crate::Result;

/// Surf-zone width in degrees: 50 m, taking one degree as 100 km.
pub const SURF_BUFFER_DEG: f64 = 0.01 * 0.05;

/// Widening of the domain outline before land is removed, in degrees.
///
/// Keeps cells near a curved domain edge fully inside the ocean region.
pub const OCEAN_MARGIN_DEG: f64 = 20.0;

/// Per-cell fractions, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfZoneFractions {
    rows: usize,
    cols: usize,
    /// Fraction of each cell covered by open ocean.
    pub open: Vec<f64>,
    /// Fraction of each cell covered by the surf zone.
    pub surf: Vec<f64>,
}

impl SurfZoneFractions {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn open_at(&self, row: usize, col: usize) -> f64 {
        self.open[row * self.cols + col]
    }

    pub fn surf_at(&self, row: usize, col: usize) -> f64 {
        self.surf[row * self.cols + col]
    }
}

/// Overlap of every cell of `grid` with the ocean and the surf zone.
///
/// `grid` must carry corner (dot-point) coordinates. Surf fractions of
/// overlapping buffers are summed, not unioned.
pub fn surf_zone_fractions(grid: &CurvilinearGrid, coastline: &Coastline) -> Result<SurfZoneFractions> {
    let (rows, cols) = (grid.rows(), grid.cols());
    let corner = |r: usize, c: usize| grid.corner(r, c).map(|(lat, lon)| (lon, lat));
    let sw = corner(0, 0)?;
    let nw = corner(rows, 0)?;
    let ne = corner(rows, cols)?;
    let se = corner(0, cols)?;
    let domain = to_polygon(&[sw, nw, ne, se]);

    let m = OCEAN_MARGIN_DEG;
    let mut ocean = MultiPolygon(vec![to_polygon(&[
        (sw.0 - m, sw.1 - m),
        (nw.0 - m, nw.1 + m),
        (ne.0 + m, ne.1 + m),
        (se.0 + m, se.1 - m),
    ])]);

    let mut zones: Vec<MultiPolygon<f64>> = Vec::new();
    let mut touching = 0usize;
    for land in coastline.land().iter() {
        if !land.intersects(&domain) {
            continue;
        }
        touching += 1;
        ocean = ocean.difference(land);
        let zone = land.buffer(SURF_BUFFER_DEG).difference(land);
        if zone.intersects(&domain) {
            zones.push(zone);
        }
    }
    debug!(
        land = coastline.len(),
        touching,
        zones = zones.len(),
        "Built ocean and surf-zone regions"
    );

    let mut open = Vec::with_capacity(rows * cols);
    let mut surf = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let cell = to_polygon(&grid.cell_polygon(row, col)?);
            let area = cell.unsigned_area();
            if area <= 0.0 {
                open.push(0.0);
                surf.push(0.0);
                continue;
            }
            open.push(overlap_area(&cell, &ocean) / area);
            surf.push(zones.iter().map(|z| overlap_area(&cell, z)).sum::<f64>() / area);
        }
    }

    Ok(SurfZoneFractions { rows, cols, open, surf })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegridError;
    use test_utils::regular_grid;

    /// Land west of 2 E; far island that never touches the domain.
    fn western_land() -> Coastline {
        Coastline::from_polygons(vec![
            to_polygon(&[(-10.0, -10.0), (2.0, -10.0), (2.0, 10.0), (-10.0, 10.0)]),
            to_polygon(&[(50.0, 50.0), (51.0, 50.0), (51.0, 51.0), (50.0, 51.0)]),
        ])
    }

    #[test]
    fn test_straight_coast() {
        // 2 rows x 4 one-degree columns spanning 0..4 E
        let grid = regular_grid(0.0, 0.0, 1.0, 1.0, 2, 4);
        let f = surf_zone_fractions(&grid, &western_land()).unwrap();
        assert_eq!((f.rows(), f.cols()), (2, 4));

        for row in 0..2 {
            // land cells
            assert!(f.open_at(row, 0).abs() < 1e-9);
            assert!(f.open_at(row, 1).abs() < 1e-9);
            assert!(f.surf_at(row, 0).abs() < 1e-9);
            // the surf strip lies on the ocean side of the coast
            assert!(f.surf_at(row, 1).abs() < 1e-9);
            assert!((f.open_at(row, 2) - 1.0).abs() < 1e-6);
            assert!((f.surf_at(row, 2) - SURF_BUFFER_DEG).abs() < 1e-6);
            assert!((f.open_at(row, 3) - 1.0).abs() < 1e-6);
            assert!(f.surf_at(row, 3).abs() < 1e-9);
        }
    }

    #[test]
    fn test_diagonal_coast_splits_cell() {
        // Land south-east of the line lat = lon
        let coast = Coastline::from_polygons(vec![to_polygon(&[(-10.0, -10.0), (10.0, 10.0), (10.0, -10.0)])]);
        let grid = regular_grid(0.0, 0.0, 1.0, 1.0, 1, 1);
        let f = surf_zone_fractions(&grid, &coast).unwrap();
        assert!((f.open[0] - 0.5).abs() < 1e-6);
        assert!((f.surf[0] - SURF_BUFFER_DEG * 2f64.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_no_land_is_all_ocean() {
        let grid = regular_grid(-35.0, 150.0, 0.5, 0.5, 2, 2);
        let f = surf_zone_fractions(&grid, &Coastline::default()).unwrap();
        assert!(f.open.iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(f.surf.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_requires_corners() {
        let centres_only = CurvilinearGrid::new(1, 1, vec![0.5], vec![0.5]).unwrap();
        assert!(matches!(
            surf_zone_fractions(&centres_only, &western_land()),
            Err(RegridError::Grid(_))
        ));
    }
}
