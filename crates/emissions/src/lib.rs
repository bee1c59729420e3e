//! Emissions and chemical conditions on CMAQ grids.
//!
//! Sources are added to an [`EmissionsAccumulator`] in a fixed order:
//!
//! 1. anthropogenic WRF-Chem emissions (direct species, then VOC lumping)
//! 2. zero-filled placeholder species
//! 3. MEGAN biogenic emissions
//! 4. GFAS fire emissions, gridded separately by [`FireGridding`]
//!
//! Every contribution is summed into the fields; [`EmissionsAccumulator::finalize`]
//! clamps negatives and yields the [`EmissionsField`] handed to [`output`].
//!
//! Initial and boundary conditions from a global CTM are built by
//! [`ConditionBuilder`] and written with the same output helpers.

pub mod anthropogenic;
pub mod biogenic;
pub mod boundary;
pub mod discover;
pub mod error;
pub mod field;
pub mod fire;
pub mod mcip;
pub mod output;
pub mod temporal;
pub mod units;

pub use anthropogenic::{
    discover_wrfchemi, hour_sources, load_host_grid, AnthropogenicSource, InputFrequency,
    WrfChemiFile,
};
pub use biogenic::{add_biogenic, megan_path, open_megan};
pub use boundary::{date_steps, ConditionBuilder, ConditionPoints, CtmProduct, CONCENTRATION_FLOOR};
pub use error::{EmissionsError, Result};
pub use field::{EmissionsAccumulator, EmissionsField, FieldShape, SpeciesField};
pub use fire::{add_fire, fire_mapping, FireGridding, GfasProduct};
pub use mcip::{read_tflags, vertical_columns, McipDomain, McipFile, McipFiles};
pub use output::{
    conditions_dataset, emissions_dataset, fire_dataset, surf_zone_dataset, write_output, IoapiHeader,
    OutputNames,
};
pub use temporal::{match_nearest_before, TemporalPolicy};
pub use units::UnitConverter;
