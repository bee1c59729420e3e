//! GFAS wildfire emissions regridded onto a CMAQ domain.
//!
//! GFAS fluxes (kg/m²/s) live on a regular lat/lon grid. Each source cell
//! is split across the CMAQ cells covering it by fraction of source area,
//! converted to kg/s with the source cell area, and spread evenly over the
//! layers up to the mean injection altitude.

use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use cmaq_common::time::{from_hours_since, midnight};
use dataset::{open_dataset, Dataset, MemoryDataset};
use regrid::latlon::bisect_right;
use regrid::{distribute, GridMapping, RegularLatLonGrid, VerticalColumn, WeightBasis};
use speciation::{MolecularWeights, SpeciesMap};
use tracing::{debug, info, warn};

use crate::field::{EmissionsAccumulator, EmissionsField, FieldShape};
use crate::units::fire_unit_factor;
use crate::{EmissionsError, Result};

pub const GFAS_LAT: &str = "g0_lat_1";
pub const GFAS_LON: &str = "g0_lon_2";
pub const GFAS_TIME: &str = "initial_time0_hours";
/// Mean altitude of maximum injection, metres above sea level.
pub const GFAS_INJECTION_HEIGHT: &str = "MAMI_GDS0_SFC_ave24h";

/// GFAS times are hours since this instant.
fn gfas_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// An opened GFAS file.
#[derive(Debug, Clone)]
pub struct GfasProduct {
    grid: RegularLatLonGrid,
    times: Vec<DateTime<Utc>>,
    dataset: MemoryDataset,
}

impl GfasProduct {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EmissionsError::missing_file("GFAS", path));
        }
        Self::from_dataset(open_dataset(path)?)
    }

    pub fn from_dataset(dataset: MemoryDataset) -> Result<Self> {
        let lat = dataset.require_variable(GFAS_LAT)?.values();
        let lon = dataset.require_variable(GFAS_LON)?.values();
        let grid = RegularLatLonGrid::from_centres(lat, lon)?;

        let epoch = gfas_epoch();
        let times: Vec<_> = dataset
            .require_variable(GFAS_TIME)?
            .values()
            .iter()
            .map(|&h| from_hours_since(epoch, h))
            .collect();
        if times.is_empty() {
            return Err(EmissionsError::invalid_input(dataset.source(), "no time steps"));
        }
        dataset.require_variable(GFAS_INJECTION_HEIGHT)?;

        debug!(
            nlat = grid.nlat(),
            nlon = grid.nlon(),
            times = times.len(),
            "Opened GFAS product"
        );
        Ok(Self {
            grid,
            times,
            dataset,
        })
    }

    pub fn grid(&self) -> &RegularLatLonGrid {
        &self.grid
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    /// Time step used for `date`: the first one after midnight, or the last
    /// one when the file ends before that.
    pub fn time_index(&self, date: NaiveDate) -> usize {
        let required = midnight(date);
        let stamps: Vec<f64> = self.times.iter().map(|t| t.timestamp() as f64).collect();
        let idx = bisect_right(&stamps, required.timestamp() as f64);
        if idx >= self.times.len() {
            let last = self.times.len() - 1;
            warn!(
                requested = %required,
                substituted = %self.times[last],
                "Fire product ends before the requested date; using its last time step"
            );
            return last;
        }
        idx
    }

    /// One time step of a `[time, lat, lon]` variable.
    fn frame(&self, name: &str, time_index: usize) -> Result<Option<&[f64]>> {
        let Some(var) = self.dataset.variable(name) else {
            return Ok(None);
        };
        let expected = self.grid.nlat() * self.grid.nlon();
        if var.frame_len() != expected {
            return Err(EmissionsError::shape_mismatch(
                format!("GFAS {} cells", name),
                expected,
                var.frame_len(),
            ));
        }
        Ok(var.frame(time_index))
    }
}

/// Area mapping from a CMAQ grid onto the fire product grid.
pub fn fire_mapping(dest: &cmaq_common::CurvilinearGrid, product: &GfasProduct) -> Result<GridMapping> {
    Ok(GridMapping::area_weighted(dest, product.grid(), WeightBasis::SourceArea)?)
}

/// Inputs for gridding one fire time step onto one domain.
#[derive(Debug, Clone, Copy)]
pub struct FireGridding<'a> {
    pub species: &'a SpeciesMap,
    pub weights: &'a MolecularWeights,
    pub mapping: &'a GridMapping,
    /// One column per destination cell, row-major.
    pub columns: &'a [VerticalColumn],
    pub layers: usize,
}

impl FireGridding<'_> {
    /// Fire emissions `[1, layers, rows, cols]` in moles/s or g/s.
    ///
    /// Source species absent from the product are skipped with a warning.
    pub fn grid(&self, product: &GfasProduct, time_index: usize) -> Result<EmissionsField> {
        let (rows, cols) = (self.mapping.dest_rows(), self.mapping.dest_cols());
        if self.columns.len() != rows * cols {
            return Err(EmissionsError::shape_mismatch(
                "vertical columns",
                rows * cols,
                self.columns.len(),
            ));
        }
        let shape = FieldShape::new(1, self.layers, rows, cols);
        let mut acc = EmissionsAccumulator::with_species(shape, self.species.destination_species());

        let injection = product
            .frame(GFAS_INJECTION_HEIGHT, time_index)?
            .ok_or_else(|| {
                EmissionsError::invalid_input(
                    product.dataset.source(),
                    format!("time step {} out of range", time_index),
                )
            })?;

        for entry in &self.species.entries {
            let Some(flux) = product.frame(&entry.source, time_index)? else {
                warn!(species = %entry.source, "Fire species not in product; skipping");
                continue;
            };
            let gridded = self.redistribute(product.grid(), flux, injection, shape);
            for target in &entry.targets {
                let factor = fire_unit_factor(&target.name, target.class, self.weights)?;
                acc.add_volume(&target.name, 0, &gridded, factor * target.coef)?;
            }
            debug!(species = %entry.source, targets = entry.targets.len(), "Gridded fire species");
        }

        let field = acc.finalize();
        info!(species = field.len(), "Gridded fire emissions");
        Ok(field)
    }

    /// kg/s per destination cell and layer.
    fn redistribute(
        &self,
        grid: &RegularLatLonGrid,
        flux: &[f64],
        injection: &[f64],
        shape: FieldShape,
    ) -> Vec<f64> {
        let frame_len = shape.frame_len();
        let mut out = vec![0.0; shape.volume_len()];
        for (row, col, contributors) in self.mapping.iter() {
            let cell = row * shape.cols + col;
            let column = &self.columns[cell];
            for w in contributors {
                let mass = flux[w.source] * w.weight * grid.areas_m2()[w.source];
                if mass == 0.0 {
                    continue;
                }
                for (k, share) in distribute(mass, injection[w.source], column)
                    .into_iter()
                    .enumerate()
                    .take(shape.layers)
                {
                    out[k * frame_len + cell] += share;
                }
            }
        }
        out
    }
}

/// Add a gridded fire field to every hour of the accumulator.
///
/// Fire species new to the accumulator are created with the field's class.
pub fn add_fire(acc: &mut EmissionsAccumulator, fire: &EmissionsField) -> Result<()> {
    let shape = acc.shape();
    let fire_shape = fire.shape();
    if (fire_shape.layers, fire_shape.rows, fire_shape.cols) != (shape.layers, shape.rows, shape.cols) {
        return Err(EmissionsError::shape_mismatch(
            "fire emissions volume",
            shape.volume_len(),
            fire_shape.volume_len(),
        ));
    }
    for (name, field) in fire.iter() {
        if acc.declare(name, field.class) {
            debug!(species = %name, "Created species for fire emissions");
        }
        let volume = &field.values[..fire_shape.volume_len()];
        for hour in 0..shape.times {
            acc.add_volume(name, hour, volume, 1.0)?;
        }
    }
    info!(species = fire.len(), "Added fire emissions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataset::Variable;
    use speciation::SpeciesClass;

    fn product(hours: &[f64]) -> GfasProduct {
        let nt = hours.len();
        let dims = ["initial_time0_hours", GFAS_LAT, GFAS_LON];
        let ds = MemoryDataset::new("gfas")
            .with_variable(GFAS_LAT, Variable::new(GFAS_LAT, &[GFAS_LAT], &[2], vec![1.5, 0.5]).unwrap())
            .and_then(|d| {
                d.with_variable(GFAS_LON, Variable::new(GFAS_LON, &[GFAS_LON], &[2], vec![0.5, 1.5]).unwrap())
            })
            .and_then(|d| {
                d.with_variable(
                    GFAS_TIME,
                    Variable::new(GFAS_TIME, &["initial_time0_hours"], &[nt], hours.to_vec()).unwrap(),
                )
            })
            .and_then(|d| {
                d.with_variable(
                    GFAS_INJECTION_HEIGHT,
                    Variable::new(GFAS_INJECTION_HEIGHT, &dims, &[nt, 2, 2], vec![0.0; nt * 4]).unwrap(),
                )
            })
            .unwrap();
        GfasProduct::from_dataset(ds).unwrap()
    }

    fn hours_at(date: NaiveDate) -> f64 {
        (midnight(date) - gfas_epoch()).num_hours() as f64
    }

    #[test]
    fn test_time_index() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let h = hours_at(d);
        let p = product(&[h - 24.0, h, h + 24.0]);
        // right-biased: the step after midnight
        assert_eq!(p.time_index(d), 2);
        let p = product(&[h - 48.0, h - 24.0]);
        assert_eq!(p.time_index(d), 1);
    }

    #[test]
    fn test_missing_coordinates() {
        let err = GfasProduct::from_dataset(MemoryDataset::new("empty")).unwrap_err();
        assert!(matches!(err, EmissionsError::Dataset(_)));
    }

    #[test]
    fn test_add_fire_repeats_every_hour() {
        let fire_shape = FieldShape::new(1, 2, 1, 1);
        let mut fire = EmissionsAccumulator::with_species(fire_shape, [("CO", SpeciesClass::Gas)]);
        fire.add_volume("CO", 0, &[2.0, 1.0], 1.0).unwrap();
        let fire = fire.finalize();

        let mut acc = EmissionsAccumulator::with_species(FieldShape::new(25, 2, 1, 1), [("CO", SpeciesClass::Gas)]);
        acc.add_cell("CO", [3, 0, 0, 0], 5.0).unwrap();
        add_fire(&mut acc, &fire).unwrap();

        let v = acc.values("CO").unwrap();
        assert_eq!(v[3 * 2], 7.0);
        assert_eq!(v[24 * 2 + 1], 1.0);
        assert_eq!(v.iter().sum::<f64>(), 5.0 + 25.0 * 3.0);
    }

    #[test]
    fn test_add_fire_shape_mismatch() {
        let fire = EmissionsAccumulator::with_species(FieldShape::new(1, 3, 1, 1), [("CO", SpeciesClass::Gas)])
            .finalize();
        let mut acc = EmissionsAccumulator::new(FieldShape::new(25, 2, 1, 1));
        assert!(matches!(
            add_fire(&mut acc, &fire),
            Err(EmissionsError::ShapeMismatch { .. })
        ));
    }
}
