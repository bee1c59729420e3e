//! Locate a destination domain as a rectangular window of a host grid.
//!
//! The CMAQ domain produced by MCIP is a trimmed copy of the WRF domain, so
//! WRF-Chem emission fields can be cut down to it without interpolation once
//! the row/column offset is known.

use cmaq_common::CurvilinearGrid;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::nearest::nearest_index;
use crate::{RegridError, Result};

/// Distance above which a corner match is reported as a warning.
pub const CORNER_MISMATCH_WARN_KM: f64 = 0.5;

/// Offset and size of a destination grid within a host grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubWindow {
    pub row0: usize,
    pub col0: usize,
    pub rows: usize,
    pub cols: usize,
}

impl SubWindow {
    /// Flat host index of window cell `(row, col)`.
    pub fn host_index(&self, row: usize, col: usize, host_cols: usize) -> usize {
        (self.row0 + row) * host_cols + self.col0 + col
    }

    /// Copy the window out of a row-major `host_rows x host_cols` frame.
    pub fn extract<T: Copy>(&self, frame: &[T], host_cols: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            let start = self.host_index(r, 0, host_cols);
            out.extend_from_slice(&frame[start..start + self.cols]);
        }
        out
    }
}

/// Match the four corner cells of `dest` to `host` and derive the window.
///
/// Corner matches further than [`CORNER_MISMATCH_WARN_KM`] are logged but
/// accepted. Corners that disagree on a shared row or column are an error.
pub fn find_subwindow(
    dest: &CurvilinearGrid,
    host: &CurvilinearGrid,
    domain: &str,
) -> Result<SubWindow> {
    let last_r = dest.rows() - 1;
    let last_c = dest.cols() - 1;
    let corners = [(0, 0), (0, last_c), (last_r, 0), (last_r, last_c)];

    let mut rows = [0usize; 4];
    let mut cols = [0usize; 4];
    for (i, &(r, c)) in corners.iter().enumerate() {
        let m = nearest_index(dest.lat(r, c), dest.lon(r, c), host);
        if m.distance_km > CORNER_MISMATCH_WARN_KM {
            warn!(
                domain = %domain,
                distance_km = m.distance_km,
                corner = ?(r, c),
                "Distance between grid points exceeds tolerance"
            );
        }
        rows[i] = m.row;
        cols[i] = m.col;
    }

    if rows[0] != rows[1] || rows[2] != rows[3] || cols[0] != cols[2] || cols[1] != cols[3] {
        return Err(RegridError::InconsistentCorners {
            domain: domain.to_string(),
            rows,
            cols,
        });
    }

    let window = SubWindow {
        row0: rows[0],
        col0: cols[0],
        rows: dest.rows(),
        cols: dest.cols(),
    };
    if window.row0 + window.rows > host.rows() || window.col0 + window.cols > host.cols() {
        return Err(RegridError::Grid(cmaq_common::PrepError::WindowOutOfBounds {
            row0: window.row0,
            col0: window.col0,
            rows: window.rows,
            cols: window.cols,
            grid_rows: host.rows(),
            grid_cols: host.cols(),
        }));
    }

    debug!(domain = %domain, ?window, "Located sub-window in host grid");
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular(rows: usize, cols: usize, lat0: f64, lon0: f64, d: f64) -> CurvilinearGrid {
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
    fn test_finds_offset() {
        let host = regular(10, 12, -40.0, 140.0, 0.1);
        let dest = host.window(3, 2, 4, 6).unwrap();
        let w = find_subwindow(&dest, &host, "d01").unwrap();
        assert_eq!(w, SubWindow { row0: 3, col0: 2, rows: 4, cols: 6 });
    }

    #[test]
    fn test_inconsistent_corners() {
        let host = regular(10, 10, 0.0, 0.0, 0.1);
        // Destination stretched in latitude at one corner only
        let mut lat = Vec::new();
        let mut lon = Vec::new();
        for r in 0..3 {
            for c in 0..3 {
                let skew = if r == 2 && c == 2 { 0.3 } else { 0.0 };
                lat.push(0.2 + r as f64 * 0.1 + skew);
                lon.push(0.2 + c as f64 * 0.1);
            }
        }
        let dest = CurvilinearGrid::new(3, 3, lat, lon).unwrap();
        let err = find_subwindow(&dest, &host, "d02").unwrap_err();
        assert!(matches!(err, RegridError::InconsistentCorners { .. }));
    }

    #[test]
    fn test_extract() {
        let w = SubWindow { row0: 1, col0: 1, rows: 2, cols: 2 };
        let frame: Vec<i32> = (0..12).collect(); // 3 x 4 host
        assert_eq!(w.extract(&frame, 4), vec![5, 6, 9, 10]);
    }
}
