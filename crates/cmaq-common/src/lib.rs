//! Common types and utilities shared across the CMAQ preparation crates.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{PrepError, PrepResult};
pub use grid::{CellGeometry, CurvilinearGrid, PointSet};
pub use time::{hourly_steps, Tflag, TimeParseError, HOURS_PER_OUTPUT_DAY};
