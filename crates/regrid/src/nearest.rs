//! Nearest-neighbour matching on a spherical Earth.

use cmaq_common::{CurvilinearGrid, PointSet};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points using the haversine formula.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Result of a nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestMatch {
    pub row: usize,
    pub col: usize,
    pub distance_km: f64,
}

/// Find the source cell centre closest to `(lat, lon)`.
///
/// Ties go to the first cell in row-major order.
pub fn nearest_index(lat: f64, lon: f64, source: &CurvilinearGrid) -> NearestMatch {
    let mut best = 0usize;
    let mut best_dist = f64::INFINITY;
    for (idx, (&slat, &slon)) in source
        .lat_values()
        .iter()
        .zip(source.lon_values())
        .enumerate()
    {
        let d = haversine_km(lat, lon, slat, slon);
        if d < best_dist {
            best_dist = d;
            best = idx;
        }
    }
    NearestMatch {
        row: best / source.cols(),
        col: best % source.cols(),
        distance_km: best_dist,
    }
}

/// Nearest source cell for every cell centre of `dest`, row-major.
pub fn nearest_for_grid(dest: &CurvilinearGrid, source: &CurvilinearGrid) -> Vec<NearestMatch> {
    dest.lat_values()
        .iter()
        .zip(dest.lon_values())
        .map(|(&lat, &lon)| nearest_index(lat, lon, source))
        .collect()
}

/// Nearest source cell for every point of `points`.
pub fn nearest_for_points(points: &PointSet, source: &CurvilinearGrid) -> Vec<NearestMatch> {
    points
        .iter()
        .map(|(lat, lon)| nearest_index(lat, lon, source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize, lat0: f64, lon0: f64, d: f64) -> CurvilinearGrid {
        let mut lat = Vec::new();
        let mut lon = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                lat.push(lat0 + r as f64 * d);
                lon.push(lon0 + c as f64 * d);
            }
        }
        CurvilinearGrid::new(rows, cols, lat, lon).unwrap()
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
        assert_eq!(haversine_km(-37.8, 144.9, -37.8, 144.9), 0.0);
    }

    #[test]
    fn test_nearest_exact_point() {
        let g = grid(5, 6, -40.0, 140.0, 0.5);
        let m = nearest_index(-39.0, 141.5, &g);
        assert_eq!((m.row, m.col), (2, 3));
        assert!(m.distance_km < 1e-9);
    }

    #[test]
    fn test_nearest_tie_prefers_first_in_row_major() {
        let g = grid(2, 2, 0.0, 0.0, 1.0);
        // Equidistant from (0,0) and (0,1) on the equator
        let m = nearest_index(0.0, 0.5, &g);
        assert_eq!((m.row, m.col), (0, 0));
    }

    #[test]
    fn test_nearest_for_points() {
        let g = grid(3, 3, 10.0, 20.0, 1.0);
        let pts = PointSet::new(vec![10.1, 11.9], vec![21.9, 20.2]).unwrap();
        let matches = nearest_for_points(&pts, &g);
        assert_eq!((matches[0].row, matches[0].col), (0, 2));
        assert_eq!((matches[1].row, matches[1].col), (2, 0));
    }
}
