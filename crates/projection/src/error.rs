//! Projection error types.

use thiserror::Error;

/// Result type alias using ProjectionError.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Unsupported IOAPI grid type GDTYP={0}")]
    UnsupportedGridType(i32),

    #[error("Invalid projection parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Grid(#[from] cmaq_common::PrepError),
}
