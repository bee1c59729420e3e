//! Shared error types.

use thiserror::Error;

/// Result type alias using PrepError.
pub type PrepResult<T> = Result<T, PrepError>;

/// Errors shared by the preparation crates.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("{what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("grid has no cell-corner (dot-point) coordinates")]
    MissingCorners,

    #[error("grid must have at least one row and one column, got {rows}x{cols}")]
    Empty { rows: usize, cols: usize },

    #[error("window {rows}x{cols} at ({row0}, {col0}) exceeds {grid_rows}x{grid_cols} grid")]
    WindowOutOfBounds {
        row0: usize,
        col0: usize,
        rows: usize,
        cols: usize,
        grid_rows: usize,
        grid_cols: usize,
    },

    #[error("cell size must be positive, got {xcell} x {ycell}")]
    InvalidCellSize { xcell: f64, ycell: f64 },
}

impl PrepError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}
