//! MEGAN biogenic emissions, already on the CMAQ grid and in CMAQ units.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use dataset::{open_dataset, Dataset, MemoryDataset};
use speciation::classify_cmaq_species;
use tracing::{debug, info};

use crate::field::EmissionsAccumulator;
use crate::{EmissionsError, Result};

/// Variables in MEGAN output that are not emitted species.
pub const EXCLUDED_VARIABLES: [&str; 4] = ["GDAY", "NR", "CH4", "TFLAG"];

/// MEGAN output hours per file.
const MEGAN_HOURS: usize = 24;

/// `MEGANv2.10.<grid>.<mechanism>.<YYYYDDD>.ncf` in `dir`.
pub fn megan_path(dir: &Path, grid: &str, mechanism: &str, date: NaiveDate) -> PathBuf {
    let yyyyddd = date.year() * 1000 + date.ordinal() as i32;
    dir.join(format!("MEGANv2.10.{}.{}.{}.ncf", grid, mechanism, yyyyddd))
}

/// Open the day's MEGAN file.
pub fn open_megan(dir: &Path, grid: &str, mechanism: &str, date: NaiveDate) -> Result<MemoryDataset> {
    let path = megan_path(dir, grid, mechanism, date);
    if !path.exists() {
        return Err(EmissionsError::missing_file("MEGAN", &path));
    }
    Ok(open_dataset(&path)?)
}

/// Add MEGAN surface emissions to hours 0..24; the closing midnight
/// repeats hour 23.
///
/// Species new to the accumulator are created, classed by CMAQ naming.
pub fn add_biogenic(acc: &mut EmissionsAccumulator, megan: &impl Dataset) -> Result<()> {
    let shape = acc.shape();
    let mut added = 0usize;
    for name in megan.variable_names() {
        if EXCLUDED_VARIABLES.contains(&name) {
            continue;
        }
        let var = megan.require_variable(name)?;
        if var.frames() < MEGAN_HOURS {
            return Err(EmissionsError::invalid_input(
                megan.source(),
                format!("{} has {} time steps, need {}", name, var.frames(), MEGAN_HOURS),
            ));
        }
        let frame_len = shape.frame_len();
        if var.frame_len() < frame_len || var.frame_len() % frame_len != 0 {
            return Err(EmissionsError::shape_mismatch(
                format!("MEGAN {} cells", name),
                frame_len,
                var.frame_len(),
            ));
        }

        if acc.declare(name, classify_cmaq_species(name)) {
            debug!(species = %name, "Created species for biogenic emissions");
        }
        for hour in 0..shape.times {
            let src_hour = hour.min(MEGAN_HOURS - 1);
            let Some(volume) = var.frame(src_hour) else {
                continue;
            };
            // Surface layer only
            acc.add_frame(name, hour, 0, &volume[..frame_len], 1.0)?;
        }
        added += 1;
    }
    info!(species = added, "Added biogenic emissions");
    Ok(())
}
