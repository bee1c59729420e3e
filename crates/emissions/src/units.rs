//! Unit conversion by species class.
//!
//! | input | class | output |
//! |---|---|---|
//! | mol/km²/h (WRF-Chem gases) | gas | moles/s per cell |
//! | µg/m²/s (WRF-Chem aerosols) | aerosol | g/s per cell |
//! | kg/s per cell (gridded fire) | gas | moles/s via `1e3 / molwt` |
//! | kg/s per cell (gridded fire) | aerosol | g/s via `1e3` |
//! | volume mixing ratio | gas | ppmV |
//! | volume mixing ratio | aerosol | µg/m³ |

use cmaq_common::CellGeometry;
use serde::{Deserialize, Serialize};
use speciation::{MolecularWeights, SpeciationError, SpeciesClass};

/// Specific gas constant of dry air, J/(K·kg).
pub const R_DRY_AIR: f64 = 286.9969;

/// Mean molecular weight of dry air, g/mol.
pub const MW_AIR: f64 = 28.97;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Grams per kilogram.
const G_PER_KG: f64 = 1.0e3;

/// ppmV to ppbV, applied only when reporting gas concentrations.
pub const PPM_TO_PPB: f64 = 1.0e3;

/// Flux conversions for one destination grid.
///
/// The cell area is computed once from the projection cell size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitConverter {
    area_km2: f64,
    area_m2: f64,
}

impl UnitConverter {
    pub fn new(geometry: CellGeometry) -> Self {
        Self {
            area_km2: geometry.area_km2(),
            area_m2: geometry.area_m2(),
        }
    }

    pub fn cell_area_km2(&self) -> f64 {
        self.area_km2
    }

    pub fn cell_area_m2(&self) -> f64 {
        self.area_m2
    }

    /// mol/km²/h to moles/s per cell.
    pub fn gas_factor(&self) -> f64 {
        self.area_km2 / SECONDS_PER_HOUR
    }

    /// µg/m²/s to g/s per cell.
    pub fn aerosol_factor(&self) -> f64 {
        self.area_m2 * 1.0e-6
    }

    pub fn flux_factor(&self, class: SpeciesClass) -> f64 {
        match class {
            SpeciesClass::Gas => self.gas_factor(),
            SpeciesClass::Aerosol => self.aerosol_factor(),
        }
    }

    pub fn gas_flux(&self, value: f64) -> f64 {
        value * self.gas_factor()
    }

    pub fn aerosol_flux(&self, value: f64) -> f64 {
        value * self.aerosol_factor()
    }

    /// Convert `value` in place by the factor for `class`.
    pub fn convert_in_place(&self, class: SpeciesClass, values: &mut [f64]) {
        let factor = self.flux_factor(class);
        for v in values {
            *v *= factor;
        }
    }
}

/// Factor from kg/s to CMAQ emission units for a fire species.
///
/// Gas species need a molecular weight.
pub fn fire_unit_factor(
    species: &str,
    class: SpeciesClass,
    weights: &MolecularWeights,
) -> Result<f64, SpeciationError> {
    match class {
        SpeciesClass::Aerosol => Ok(G_PER_KG),
        SpeciesClass::Gas => Ok(G_PER_KG / weights.require(species)?),
    }
}

/// Volume mixing ratio to ppmV.
pub fn vmr_to_ppmv(vmr: f64) -> f64 {
    vmr * 1.0e6
}

/// Volume mixing ratio of an aerosol tracer to µg/m³.
///
/// `VMR * P / (R * T) * (mw / MW_AIR) * 1e9`, with `pressure` in Pa and
/// `temperature` in K.
pub fn vmr_to_aerosol_mass(vmr: f64, pressure: f64, temperature: f64, molecular_weight: f64) -> f64 {
    vmr * pressure / R_DRY_AIR / temperature * molecular_weight / MW_AIR * 1.0e9
}
