//! Error types for species table loading.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for speciation operations.
pub type Result<T> = std::result::Result<T, SpeciationError>;

/// Errors raised while reading species tables.
///
/// All of these are configuration errors: the table was authored
/// incorrectly and the run cannot continue.
#[derive(Error, Debug)]
pub enum SpeciationError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot classify line {line_no} \"{line}\" in species table {table}")]
    InvalidTableRow {
        table: String,
        line_no: usize,
        line: String,
    },

    #[error("line {line_no} of {table} has {species} destination species but {coefficients} coefficients")]
    CardinalityMismatch {
        table: String,
        line_no: usize,
        species: usize,
        coefficients: usize,
    },

    #[error("species {species} is produced by more than one row of {table}")]
    DuplicateDestination { table: String, species: String },

    #[error("line {line_no} of {table}: expected {expected}")]
    MissingColumn {
        table: String,
        line_no: usize,
        expected: &'static str,
    },

    #[error("line {line_no} of {table}: '{value}' is not a number")]
    InvalidNumber {
        table: String,
        line_no: usize,
        value: String,
    },

    #[error("could not read the header of namelist {table}: found {found} 'SPC:MOLWT:' lines")]
    NamelistHeader { table: String, found: usize },

    #[error("could not read the tail of namelist {table}: found {found} '/' lines")]
    NamelistTail { table: String, found: usize },

    #[error("header should come before the tail in namelist {table}")]
    NamelistOrder { table: String },

    #[error("no molecular weight for gas-phase species {species}")]
    MissingMolecularWeight { species: String },
}

impl SpeciationError {
    /// Create an Io error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an InvalidNumber error.
    pub fn invalid_number(table: &str, line_no: usize, value: &str) -> Self {
        Self::InvalidNumber {
            table: table.to_string(),
            line_no,
            value: value.to_string(),
        }
    }
}

/// Parse a float column, reporting the table position on failure.
pub(crate) fn parse_number(table: &str, line_no: usize, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| SpeciationError::invalid_number(table, line_no, value.trim()))
}

/// Read a whole table file.
pub(crate) fn read_table(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SpeciationError::io(path, e))
}
