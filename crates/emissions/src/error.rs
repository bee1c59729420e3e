//! Error types for emissions processing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for emissions operations.
pub type Result<T> = std::result::Result<T, EmissionsError>;

/// Errors that abort processing of a date/domain unit.
#[derive(Error, Debug)]
pub enum EmissionsError {
    /// A required input file (grid, meteorology or source) is absent.
    #[error("required {what} file not found: {}", path.display())]
    MissingFile { what: String, path: PathBuf },

    /// No file matched a discovery pattern.
    #[error("no {what} files found in {}", dir.display())]
    NoInputFiles { what: String, dir: PathBuf },

    /// A directory scan failed.
    #[error("failed to scan {}: {message}", dir.display())]
    Scan { dir: PathBuf, message: String },

    /// No source time satisfies the temporal matching rules.
    #[error("no source time matches {requested} among {available} candidates")]
    NoTemporalMatch {
        requested: DateTime<Utc>,
        available: usize,
    },

    /// A contribution targets a species that was never declared.
    #[error("species {0} is not part of the emissions field")]
    UnknownSpecies(String),

    /// Array lengths disagree.
    #[error("{what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Source data is present but unusable.
    #[error("invalid input {source_name}: {reason}")]
    InvalidInput { source_name: String, reason: String },

    #[error(transparent)]
    Dataset(#[from] dataset::DatasetError),

    #[error(transparent)]
    Speciation(#[from] speciation::SpeciationError),

    #[error(transparent)]
    Regrid(#[from] regrid::RegridError),

    #[error(transparent)]
    Projection(#[from] projection::ProjectionError),

    #[error(transparent)]
    Grid(#[from] cmaq_common::PrepError),

    #[error(transparent)]
    Time(#[from] cmaq_common::TimeParseError),
}

impl EmissionsError {
    /// Create a MissingFile error.
    pub fn missing_file(what: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self::MissingFile {
            what: what.into(),
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the run failed because an input file is missing.
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self,
            Self::MissingFile { .. }
                | Self::NoInputFiles { .. }
                | Self::Dataset(dataset::DatasetError::MissingFile { .. })
        )
    }
}
