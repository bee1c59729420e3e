//! Coordinate reference system transformations for CMAQ grids.
//!
//! IOAPI files describe their horizontal grid with a handful of global
//! attributes (`GDTYP`, `P_ALP`, `P_BET`, `P_GAM`, `XCENT`, `YCENT`,
//! `XORIG`, `YORIG`, `XCELL`, `YCELL`). This crate turns those attributes
//! into cell-centre and cell-corner latitude/longitude arrays.

pub mod error;
pub mod ioapi;
pub mod lambert;

pub use error::{ProjectionError, ProjectionResult};
pub use ioapi::{IoapiGridDef, GDTYP_LAMBERT};
pub use lambert::LambertConformal;
