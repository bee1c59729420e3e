//! Gridded dataset access for CMAQ preparation.
//!
//! Every input the preparation pipeline consumes (MCIP grid and
//! meteorology files, WRF-Chem emissions, GFAS, MEGAN, global CTM output)
//! is a set of named dimensions, global attributes and n-dimensional
//! variables. The [`Dataset`] trait exposes exactly that, read-only.
//!
//! [`MemoryDataset`] is the in-process implementation; it round-trips
//! through JSON files via [`open_dataset`] and [`write_dataset`].
//!
//! # Layout
//!
//! Variable data is stored flat in row-major order with the last dimension
//! varying fastest, like NetCDF.

mod error;
mod io;
mod memory;
mod value;

pub use error::{DatasetError, DatasetResult};
pub use io::{open_dataset, write_dataset};
pub use memory::MemoryDataset;
pub use value::{AttrValue, Variable};

/// Read-only access to a gridded dataset.
pub trait Dataset {
    /// Human-readable origin of the data, used in error messages.
    fn source(&self) -> &str;

    /// Length of a named dimension.
    fn dimension(&self, name: &str) -> Option<usize>;

    /// Global attribute.
    fn attribute(&self, name: &str) -> Option<&AttrValue>;

    /// Variable by name.
    fn variable(&self, name: &str) -> Option<&Variable>;

    /// Names of all variables, sorted.
    fn variable_names(&self) -> Vec<&str>;

    fn has_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Variable by name, or a `MissingVariable` error.
    fn require_variable(&self, name: &str) -> DatasetResult<&Variable> {
        self.variable(name)
            .ok_or_else(|| DatasetError::missing_variable(self.source(), name))
    }

    /// Dimension length, or a `MissingDimension` error.
    fn require_dimension(&self, name: &str) -> DatasetResult<usize> {
        self.dimension(name)
            .ok_or_else(|| DatasetError::missing_dimension(self.source(), name))
    }

    /// Global attribute, or a `MissingAttribute` error.
    fn require_attribute(&self, name: &str) -> DatasetResult<&AttrValue> {
        self.attribute(name)
            .ok_or_else(|| DatasetError::missing_attribute(self.source(), name))
    }

    /// Numeric scalar global attribute.
    fn attr_f64(&self, name: &str) -> DatasetResult<f64> {
        self.require_attribute(name)?
            .as_f64()
            .ok_or_else(|| DatasetError::invalid_attribute(self.source(), name, "a number"))
    }

    /// Numeric array global attribute (scalars become one-element arrays).
    fn attr_f64_vec(&self, name: &str) -> DatasetResult<Vec<f64>> {
        self.require_attribute(name)?
            .as_f64_vec()
            .ok_or_else(|| DatasetError::invalid_attribute(self.source(), name, "numbers"))
    }
}
