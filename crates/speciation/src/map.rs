//! One-to-many species maps with fractional coefficients.
//!
//! Two layouts are in use. Fire maps are
//! `source ; dest1,dest2 ; coef1,coef2` and boundary-condition maps carry a
//! free-text column after the source name:
//! `source ; description ; dest1,dest2 ; coef1,coef2`. In both the first
//! line is a header and blank lines are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::class::{classify_bcon_species, classify_fire_species, SpeciesClass};
use crate::error::{parse_number, read_table, Result, SpeciationError};

/// Column layout and aerosol naming rule of a species map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapLayout {
    /// Fire product to CMAQ emissions.
    Fire,
    /// Global CTM to CMAQ initial/boundary conditions.
    Boundary,
}

impl MapLayout {
    fn species_column(self) -> usize {
        match self {
            MapLayout::Fire => 1,
            MapLayout::Boundary => 2,
        }
    }

    fn classify(self, name: &str) -> SpeciesClass {
        match self {
            MapLayout::Fire => classify_fire_species(name),
            MapLayout::Boundary => classify_bcon_species(name),
        }
    }
}

/// A destination species and its share of the source species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedSpecies {
    pub name: String,
    pub coef: f64,
    pub class: SpeciesClass,
}

/// A source species and the destination species it is split into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesMapEntry {
    pub source: String,
    pub targets: Vec<MappedSpecies>,
}

impl SpeciesMapEntry {
    /// Class used to convert the source field before it is split. Taken
    /// from the first destination species.
    pub fn source_class(&self) -> SpeciesClass {
        self.targets
            .first()
            .map(|t| t.class)
            .unwrap_or(SpeciesClass::Gas)
    }
}

/// A parsed species map, entries in file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesMap {
    pub layout: MapLayout,
    pub entries: Vec<SpeciesMapEntry>,
}

impl SpeciesMap {
    pub fn load(path: impl AsRef<Path>, layout: MapLayout) -> Result<Self> {
        let path = path.as_ref();
        let text = read_table(path)?;
        Self::parse(&text, &path.display().to_string(), layout)
    }

    pub fn parse(text: &str, table: &str, layout: MapLayout) -> Result<Self> {
        let species_col = layout.species_column();
        let coef_col = species_col + 1;
        let mut entries = Vec::new();

        for (idx, line) in text.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;
            let words: Vec<&str> = line.split(';').collect();
            if words.len() <= coef_col {
                return Err(SpeciationError::MissingColumn {
                    table: table.to_string(),
                    line_no,
                    expected: match layout {
                        MapLayout::Fire => "source ; species ; coefficients",
                        MapLayout::Boundary => "source ; description ; species ; coefficients",
                    },
                });
            }

            let names: Vec<&str> = words[species_col].split(',').map(str::trim).collect();
            let coefs = words[coef_col]
                .split(',')
                .map(|c| parse_number(table, line_no, c))
                .collect::<Result<Vec<f64>>>()?;
            if names.len() != coefs.len() {
                return Err(SpeciationError::CardinalityMismatch {
                    table: table.to_string(),
                    line_no,
                    species: names.len(),
                    coefficients: coefs.len(),
                });
            }

            let targets = names
                .into_iter()
                .zip(coefs)
                .map(|(name, coef)| MappedSpecies {
                    name: name.to_string(),
                    coef,
                    class: layout.classify(name),
                })
                .collect();
            entries.push(SpeciesMapEntry {
                source: words[0].trim().to_string(),
                targets,
            });
        }

        debug!(table = %table, entries = entries.len(), ?layout, "Loaded species map");
        Ok(Self { layout, entries })
    }

    /// Every destination species, sorted by name, with its class.
    pub fn destination_species(&self) -> BTreeMap<String, SpeciesClass> {
        self.entries
            .iter()
            .flat_map(|e| e.targets.iter())
            .map(|t| (t.name.clone(), t.class))
            .collect()
    }

    pub fn entry(&self, source: &str) -> Option<&SpeciesMapEntry> {
        self.entries.iter().find(|e| e.source == source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
