//! Error types for grid correspondence.

use thiserror::Error;

/// Errors that can occur while building grid correspondences.
#[derive(Error, Debug)]
pub enum RegridError {
    /// Corner matches of a sub-window disagree on a shared row or column.
    #[error("corner indices not consistent between grids for domain {domain}: rows {rows:?}, cols {cols:?}")]
    InconsistentCorners {
        domain: String,
        rows: [usize; 4],
        cols: [usize; 4],
    },

    /// A grid or axis was empty.
    #[error("empty grid: {0}")]
    EmptyGrid(String),

    /// Array lengths disagree.
    #[error("{what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Vertical interfaces are not strictly increasing.
    #[error("layer interface heights must be strictly increasing")]
    NonMonotonicLevels,

    /// A coastline shapefile could not be read.
    #[error("failed to read shapefile {path}: {message}")]
    Shapefile { path: String, message: String },

    /// Grid construction error.
    #[error(transparent)]
    Grid(#[from] cmaq_common::PrepError),
}

impl RegridError {
    /// Create an EmptyGrid error.
    pub fn empty_grid(msg: impl Into<String>) -> Self {
        Self::EmptyGrid(msg.into())
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Create a Shapefile error.
    pub fn shapefile(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Shapefile {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Result type for grid correspondence operations.
pub type Result<T> = std::result::Result<T, RegridError>;
