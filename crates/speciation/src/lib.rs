//! Species tables linking source chemistry products to CMAQ species.
//!
//! - [`ConversionTable`]: WRF-Chem anthropogenic emissions, classified row
//!   by row into direct conversions, VOC lumping and zero-filled species.
//! - [`SpeciesMap`]: one-to-many maps with coefficients, for fire
//!   emissions and for initial/boundary conditions.
//! - [`MolecularWeights`]: gas-phase molecular weights from CMAQ namelists.
//!
//! Authoring mistakes in a table are errors. Species that a table names
//! but an input file lacks are reported as warnings by the callers.

pub mod anthropogenic;
pub mod class;
pub mod ctm;
pub mod error;
pub mod map;
pub mod namelist;

pub use anthropogenic::{classify_row, ConversionTable, DirectMapping, OrganicLumping, TableRow};
pub use class::{classify_bcon_species, classify_cmaq_species, classify_fire_species, SpeciesClass};
pub use ctm::aerosol_molecular_weight;
pub use error::{Result, SpeciationError};
pub use map::{MapLayout, MappedSpecies, SpeciesMap, SpeciesMapEntry};
pub use namelist::MolecularWeights;
