//! Initial and boundary conditions interpolated from global CTM output.
//!
//! The CTM (MOZART / CAM-chem) stores volume mixing ratios on a hybrid
//! sigma-pressure grid over a regular lat/lon mesh, `[time, lev, lat, lon]`.
//! Every CMAQ layer takes the CTM level closest in pressure, and every CMAQ
//! cell (interior) or perimeter point (boundary) takes the nearest CTM
//! column. Values are converted to ppmV (gases) or µg/m³ (aerosols).

use std::ops::Range;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use cmaq_common::time::from_days_since;
use cmaq_common::{CurvilinearGrid, PointSet, Tflag};
use dataset::{open_dataset, Dataset, MemoryDataset, Variable};
use regrid::levels::{closest_levels, hybrid_pressures, sigma_layer_pressures};
use regrid::nearest::{nearest_for_grid, nearest_for_points};
use regrid::NearestMatch;
use speciation::{aerosol_molecular_weight, SpeciationError, SpeciesClass, SpeciesMap, SpeciesMapEntry};
use tracing::{debug, info, warn};

use crate::field::{EmissionsAccumulator, EmissionsField, FieldShape};
use crate::temporal::match_nearest_before;
use crate::units::{vmr_to_aerosol_mass, vmr_to_ppmv, PPM_TO_PPB};
use crate::{EmissionsError, Result};

/// Smallest concentration written for any mapped species.
pub const CONCENTRATION_FLOOR: f64 = 1.0e-30;

/// CTM `time` values count days from year 0; day 366 is the epoch.
const CTM_TIME_OFFSET_DAYS: f64 = 366.0;

/// An opened global CTM file.
#[derive(Debug, Clone)]
pub struct CtmProduct {
    mesh: CurvilinearGrid,
    hyam: Vec<f64>,
    hybm: Vec<f64>,
    p0: f64,
    times: Vec<DateTime<Utc>>,
    dataset: MemoryDataset,
}

impl CtmProduct {
    pub fn open(path: &Path, epoch: DateTime<Utc>) -> Result<Self> {
        if !path.exists() {
            return Err(EmissionsError::missing_file("global CTM", path));
        }
        Self::from_dataset(open_dataset(path)?, epoch)
    }

    /// `epoch` is the instant the CTM calendar calls day 366.
    pub fn from_dataset(dataset: MemoryDataset, epoch: DateTime<Utc>) -> Result<Self> {
        let lat = dataset.require_variable("lat")?.values();
        let lon = dataset.require_variable("lon")?.values();
        let (nlat, nlon) = (lat.len(), lon.len());
        let mut mesh_lat = Vec::with_capacity(nlat * nlon);
        let mut mesh_lon = Vec::with_capacity(nlat * nlon);
        for &la in lat {
            for &lo in lon {
                mesh_lat.push(la);
                mesh_lon.push(lo);
            }
        }
        let mesh = CurvilinearGrid::new(nlat, nlon, mesh_lat, mesh_lon)?;

        let hyam = dataset.require_variable("hyam")?.values().to_vec();
        let hybm = dataset.require_variable("hybm")?.values().to_vec();
        if hyam.len() != hybm.len() {
            return Err(EmissionsError::shape_mismatch("hybm levels", hyam.len(), hybm.len()));
        }
        let p0 = dataset
            .require_variable("P0")?
            .values()
            .first()
            .copied()
            .ok_or_else(|| EmissionsError::invalid_input(dataset.source(), "P0 is empty"))?;

        let times: Vec<_> = dataset
            .require_variable("time")?
            .values()
            .iter()
            .map(|&d| from_days_since(epoch, d - CTM_TIME_OFFSET_DAYS))
            .collect();

        let ps = dataset.require_variable("PS")?;
        let expected = [times.len(), nlat, nlon];
        if ps.shape != expected {
            return Err(EmissionsError::invalid_input(
                dataset.source(),
                format!("PS has shape {:?}, expected {:?}", ps.shape, expected),
            ));
        }
        dataset.require_variable("T")?;

        debug!(
            nlat,
            nlon,
            levels = hyam.len(),
            times = times.len(),
            "Opened global CTM product"
        );
        Ok(Self {
            mesh,
            hyam,
            hybm,
            p0,
            times,
            dataset,
        })
    }

    pub fn mesh(&self) -> &CurvilinearGrid {
        &self.mesh
    }

    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    pub fn levels(&self) -> usize {
        self.hyam.len()
    }

    /// CTM level for every CMAQ layer, from a single reference surface
    /// pressure.
    pub fn level_indices(&self, surface_pressure: f64, sigma: &[f64], top_pressure: f64) -> Vec<usize> {
        let dest = sigma_layer_pressures(surface_pressure, top_pressure, sigma);
        let source = hybrid_pressures(&self.hyam, &self.hybm, self.p0, surface_pressure);
        closest_levels(&source, &dest)
    }

    fn surface_pressure(&self, time: usize, at: &NearestMatch) -> Result<f64> {
        self.dataset
            .require_variable("PS")?
            .get(&[time, at.row, at.col])
            .ok_or_else(|| self.out_of_range("PS", time))
    }

    fn sample(&self, var: &Variable, name: &str, time: usize, level: usize, at: &NearestMatch) -> Result<f64> {
        var.get(&[time, level, at.row, at.col])
            .ok_or_else(|| self.out_of_range(name, time))
    }

    fn out_of_range(&self, name: &str, time: usize) -> EmissionsError {
        EmissionsError::invalid_input(
            self.dataset.source(),
            format!("{} has no value at time step {}", name, time),
        )
    }

    /// Converted values `[layer][point]` of one source species, or `None`
    /// when the CTM file lacks it.
    fn extract(
        &self,
        entry: &SpeciesMapEntry,
        time: usize,
        levels: &[usize],
        points: &[NearestMatch],
    ) -> Result<Option<Vec<f64>>> {
        let Some(var) = self.dataset.variable(&entry.source) else {
            return Ok(None);
        };
        let class = entry.source_class();
        let aerosol = match class {
            SpeciesClass::Aerosol => {
                let mw = aerosol_molecular_weight(&entry.source).ok_or_else(|| {
                    SpeciationError::MissingMolecularWeight {
                        species: entry.source.clone(),
                    }
                })?;
                Some((mw, self.dataset.require_variable("T")?))
            }
            SpeciesClass::Gas => None,
        };

        let mut out = Vec::with_capacity(levels.len() * points.len());
        for &lev in levels {
            for at in points {
                let vmr = self.sample(var, &entry.source, time, lev, at)?;
                let value = match aerosol {
                    Some((mw, temperature)) => {
                        let ps = self.surface_pressure(time, at)?;
                        let p = self.hyam[lev] * self.p0 + self.hybm[lev] * ps;
                        let t = self.sample(temperature, "T", time, lev, at)?;
                        vmr_to_aerosol_mass(vmr, p, t, mw)
                    }
                    None => vmr_to_ppmv(vmr),
                };
                out.push(value);
            }
        }
        Ok(Some(out))
    }
}

/// Steps of a METCRO2D `TFLAG` axis belonging to `date`, plus the step
/// after the last one (the closing midnight) when present.
pub fn date_steps(tflags: &[Tflag], date: NaiveDate) -> Result<Range<usize>> {
    let mut on_date = Vec::new();
    for (i, flag) in tflags.iter().enumerate() {
        if flag.to_datetime()?.date_naive() == date {
            on_date.push(i);
        }
    }
    match (on_date.first(), on_date.last()) {
        (Some(&first), Some(&last)) => Ok(first..(last + 2).min(tflags.len())),
        _ => Err(EmissionsError::invalid_input(
            "METCRO2D",
            format!("no time steps on {}", date),
        )),
    }
}

/// Where conditions are sampled: destination points and their CTM columns.
#[derive(Debug, Clone)]
pub struct ConditionPoints {
    shape: FieldShape,
    matches: Vec<NearestMatch>,
}

impl ConditionPoints {
    /// Every cell centre of the CMAQ grid, `[1, layers, rows, cols]`.
    pub fn interior(grid: &CurvilinearGrid, layers: usize, product: &CtmProduct) -> Self {
        Self {
            shape: FieldShape::new(1, layers, grid.rows(), grid.cols()),
            matches: nearest_for_grid(grid, product.mesh()),
        }
    }

    /// The boundary perimeter, `[1, layers, 1, perimeter]`.
    pub fn perimeter(points: &PointSet, layers: usize, product: &CtmProduct) -> Self {
        Self {
            shape: FieldShape::new(1, layers, 1, points.len()),
            matches: nearest_for_points(points, product.mesh()),
        }
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Builds concentration fields for a level mapping and one or more CMAQ
/// time steps.
#[derive(Debug, Clone)]
pub struct ConditionBuilder<'a> {
    product: &'a CtmProduct,
    species: &'a SpeciesMap,
    levels: Vec<usize>,
    time_indices: Vec<usize>,
}

impl<'a> ConditionBuilder<'a> {
    /// A single step at `first_time`, the first CMAQ step of the date; the
    /// CTM step used is the last one at or before it.
    pub fn new(
        product: &'a CtmProduct,
        species: &'a SpeciesMap,
        levels: Vec<usize>,
        first_time: DateTime<Utc>,
    ) -> Result<Self> {
        Self::for_times(product, species, levels, &[first_time])
    }

    /// One output step per entry of `times`, each served by the last CTM
    /// step at or before it.
    pub fn for_times(
        product: &'a CtmProduct,
        species: &'a SpeciesMap,
        levels: Vec<usize>,
        times: &[DateTime<Utc>],
    ) -> Result<Self> {
        if times.is_empty() {
            return Err(EmissionsError::invalid_input("CTM conditions", "no output times requested"));
        }
        let time_indices = times
            .iter()
            .map(|&t| {
                let idx = match_nearest_before(t, product.times())?;
                debug!(requested = %t, matched = %product.times()[idx], "Selected CTM time step");
                Ok(idx)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            product,
            species,
            levels,
            time_indices,
        })
    }

    /// CTM step serving the first output time.
    pub fn time_index(&self) -> usize {
        self.time_indices[0]
    }

    pub fn time_indices(&self) -> &[usize] {
        &self.time_indices
    }

    /// Concentrations at `points`, `[times, layers, ...]`.
    ///
    /// Every destination species starts at zero and receives
    /// `max(value * coef, 1e-30)` from each source mapped to it. Sources
    /// missing from the CTM file contribute only the floor.
    pub fn build(&self, points: &ConditionPoints) -> Result<EmissionsField> {
        let frame = points.shape();
        if self.levels.len() != frame.layers {
            return Err(EmissionsError::shape_mismatch("CTM level mapping", frame.layers, self.levels.len()));
        }
        if points.len() != frame.frame_len() {
            return Err(EmissionsError::shape_mismatch("condition points", frame.frame_len(), points.len()));
        }
        let shape = FieldShape::new(self.time_indices.len(), frame.layers, frame.rows, frame.cols);
        let mut acc = EmissionsAccumulator::with_species(shape, self.species.destination_species());

        for entry in &self.species.entries {
            for (slot, &time) in self.time_indices.iter().enumerate() {
                let values = match self.product.extract(entry, time, &self.levels, &points.matches)? {
                    Some(values) => values,
                    None => {
                        if slot == 0 {
                            warn!(
                                species = %entry.source,
                                "Species not found in CTM file; contributions will be zero"
                            );
                        }
                        vec![0.0; shape.volume_len()]
                    }
                };

                if slot == 0 {
                    let factor = match entry.source_class() {
                        SpeciesClass::Gas => PPM_TO_PPB,
                        SpeciesClass::Aerosol => 1.0,
                    };
                    let frame_len = shape.frame_len();
                    let mean = values[..frame_len].iter().sum::<f64>() / frame_len.max(1) as f64;
                    debug!(species = %entry.source, first_layer_mean = mean * factor, "Interpolated CTM species");
                }

                for target in &entry.targets {
                    let floored: Vec<f64> = values
                        .iter()
                        .map(|&v| (v * target.coef).max(CONCENTRATION_FLOOR))
                        .collect();
                    acc.add_volume(&target.name, slot, &floored, 1.0)?;
                }
            }
        }

        let field = acc.finalize();
        info!(
            species = field.len(),
            points = points.len(),
            times = shape.times,
            "Built CTM conditions"
        );
        Ok(field)
    }
}
