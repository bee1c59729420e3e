//! Synthetic grids and fields with predictable, verifiable values.

use cmaq_common::CurvilinearGrid;

/// Creates a field where each cell value is `col * 1000 + row`.
///
/// Row-major, row 0 first, so `field[row * cols + col] == col * 1000 + row`.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(cols: usize, rows: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// A field increasing by `step` per element.
pub fn ramp_field(len: usize, start: f64, step: f64) -> Vec<f64> {
    (0..len).map(|i| start + step * i as f64).collect()
}

/// `n` values starting at `start` spaced by `step` (negative for descending).
pub fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// A lat/lon-aligned curvilinear grid with corner coordinates.
///
/// Cell `(row, col)` spans `south + row * dlat .. south + (row + 1) * dlat`
/// and `west + col * dlon .. west + (col + 1) * dlon`; row 0 is the
/// southernmost row, as in MCIP output.
pub fn regular_grid(
    south: f64,
    west: f64,
    dlat: f64,
    dlon: f64,
    rows: usize,
    cols: usize,
) -> CurvilinearGrid {
    let mut lat = Vec::with_capacity(rows * cols);
    let mut lon = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            lat.push(south + (row as f64 + 0.5) * dlat);
            lon.push(west + (col as f64 + 0.5) * dlon);
        }
    }
    let mut corner_lat = Vec::with_capacity((rows + 1) * (cols + 1));
    let mut corner_lon = Vec::with_capacity((rows + 1) * (cols + 1));
    for row in 0..=rows {
        for col in 0..=cols {
            corner_lat.push(south + row as f64 * dlat);
            corner_lon.push(west + col as f64 * dlon);
        }
    }
    CurvilinearGrid::new(rows, cols, lat, lon)
        .and_then(|g| g.with_corners(corner_lat, corner_lon))
        .expect("generated grid is consistent")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(3, 2);
        assert_eq!(grid, vec![0.0, 1000.0, 2000.0, 1.0, 1001.0, 2001.0]);
    }

    #[test]
    fn test_regular_grid_geometry() {
        let g = regular_grid(-35.0, 150.0, 0.5, 0.5, 2, 3);
        assert_eq!(g.rows(), 2);
        assert_eq!(g.cols(), 3);
        assert_eq!(g.lat(0, 0), -34.75);
        assert_eq!(g.lon(1, 2), 151.25);
        assert_eq!(g.corner(2, 3).unwrap(), (-34.0, 151.5));
    }

    #[test]
    fn test_axis_descending() {
        assert_eq!(axis(1.5, -1.0, 3), vec![1.5, 0.5, -0.5]);
    }

    #[test]
    fn test_ramp_field() {
        assert_eq!(ramp_field(3, 1.0, 0.5), vec![1.0, 1.5, 2.0]);
    }
}
