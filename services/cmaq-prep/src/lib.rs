//! CMAQ input preparation service library.
//!
//! Loads a YAML run configuration and drives the emissions and
//! initial/boundary-condition builders over every configured date and
//! domain.

pub mod config;
pub mod pipeline;

pub use config::RunConfig;
pub use pipeline::{Pipeline, RunSummary};
