//! Gas-phase versus aerosol species.
//!
//! CMAQ aerosol species carry a mode suffix (`I` Aitken, `J` accumulation,
//! `K` coarse); several naming rules are used to recognise them depending
//! on the source product.

use serde::{Deserialize, Serialize};

/// Unit-conversion regime of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesClass {
    /// Tracked in moles.
    Gas,
    /// Tracked by mass.
    Aerosol,
}

impl SpeciesClass {
    pub fn from_aerosol_flag(is_aerosol: bool) -> Self {
        if is_aerosol {
            SpeciesClass::Aerosol
        } else {
            SpeciesClass::Gas
        }
    }

    pub fn is_aerosol(self) -> bool {
        self == SpeciesClass::Aerosol
    }

    /// CMAQ emission units for this class.
    pub fn emission_units(self) -> &'static str {
        match self {
            SpeciesClass::Gas => "moles/s",
            SpeciesClass::Aerosol => "g/s",
        }
    }

    /// CMAQ initial/boundary condition units for this class.
    pub fn concentration_units(self) -> &'static str {
        match self {
            SpeciesClass::Gas => "ppmV",
            SpeciesClass::Aerosol => "micrograms/m**3",
        }
    }
}

fn has_mode_suffix(name: &str) -> bool {
    matches!(name.chars().last(), Some('I' | 'J' | 'K'))
}

/// Species created on the fly while merging (biogenic, fire): aerosol when
/// the name starts with `A` and ends in a mode suffix.
pub fn classify_cmaq_species(name: &str) -> SpeciesClass {
    SpeciesClass::from_aerosol_flag(name.starts_with('A') && has_mode_suffix(name))
}

/// Fire destination species: aerosol when the name ends in a mode suffix.
pub fn classify_fire_species(name: &str) -> SpeciesClass {
    SpeciesClass::from_aerosol_flag(has_mode_suffix(name))
}

/// Boundary-condition destination species: the moded rule plus the two
/// unmoded sea-salt and soil species.
pub fn classify_bcon_species(name: &str) -> SpeciesClass {
    let aerosol = (name.starts_with('A') && has_mode_suffix(name))
        || name == "ASEACAT"
        || name == "ASOIL";
    SpeciesClass::from_aerosol_flag(aerosol)
}
