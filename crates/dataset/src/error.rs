//! Error types for dataset access.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Error types for dataset access.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A required file does not exist
    #[error("required file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Missing required variable
    #[error("variable '{name}' not found in {source_name}")]
    MissingVariable { source_name: String, name: String },

    /// Missing required dimension
    #[error("dimension '{name}' not found in {source_name}")]
    MissingDimension { source_name: String, name: String },

    /// Missing required global attribute
    #[error("attribute '{name}' not found in {source_name}")]
    MissingAttribute { source_name: String, name: String },

    /// Attribute present with the wrong type
    #[error("attribute '{name}' in {source_name} is not {expected}")]
    InvalidAttribute {
        source_name: String,
        name: String,
        expected: String,
    },

    /// Data length does not match the declared shape
    #[error("variable '{name}': shape {shape:?} needs {expected} values, got {actual}")]
    ShapeMismatch {
        name: String,
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// File I/O error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed dataset file
    #[error("invalid dataset file {}: {source}", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DatasetError {
    /// Create a MissingFile error.
    pub fn missing_file(path: impl AsRef<Path>) -> Self {
        Self::MissingFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a MissingVariable error.
    pub fn missing_variable(source_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingVariable {
            source_name: source_name.into(),
            name: name.into(),
        }
    }

    /// Create a MissingDimension error.
    pub fn missing_dimension(source_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingDimension {
            source_name: source_name.into(),
            name: name.into(),
        }
    }

    /// Create a MissingAttribute error.
    pub fn missing_attribute(source_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::MissingAttribute {
            source_name: source_name.into(),
            name: name.into(),
        }
    }

    /// Create an InvalidAttribute error.
    pub fn invalid_attribute(
        source_name: impl Into<String>,
        name: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            source_name: source_name.into(),
            name: name.into(),
            expected: expected.into(),
        }
    }

    /// Create an Io error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
