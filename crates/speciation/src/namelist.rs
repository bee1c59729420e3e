//! Molecular weights from CMAQ species namelists.
//!
//! Entries sit between the `'SPC:MOLWT:...'` header (plus the ruler line
//! after it) and the closing `/`:
//!
//! ```text
//! 'SPC:MOLWT:EMIS_SUR:EMIS_FAC',
//! !-------------------------------
//! 'NO:30.0:EMIS:1.0',
//! /
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{parse_number, read_table, Result, SpeciationError};

const HEADER_MARKER: &str = "'SPC:MOLWT:";
const TAIL: &str = "/";

/// Molecular weights in g/mol keyed by species name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MolecularWeights {
    weights: BTreeMap<String, f64>,
}

impl MolecularWeights {
    /// Load several namelists; later files override earlier ones.
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut out = Self::default();
        for path in paths {
            out.extend(Self::load(path)?);
        }
        Ok(out)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_table(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, table: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();

        let heads: Vec<usize> = positions(&lines, |l| l.contains(HEADER_MARKER));
        if heads.len() != 1 {
            return Err(SpeciationError::NamelistHeader {
                table: table.to_string(),
                found: heads.len(),
            });
        }
        let tails: Vec<usize> = positions(&lines, |l| l == TAIL);
        if tails.len() != 1 {
            return Err(SpeciationError::NamelistTail {
                table: table.to_string(),
                found: tails.len(),
            });
        }
        let (first, tail) = (heads[0] + 2, tails[0]);
        if first > tail {
            return Err(SpeciationError::NamelistOrder {
                table: table.to_string(),
            });
        }

        let mut weights = BTreeMap::new();
        for (offset, line) in lines[first..tail].iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_no = first + offset + 1;
            let cleaned = line.replace('\'', "");
            let mut parts = cleaned.split(':');
            let name = parts.next().unwrap_or_default().trim();
            let molwt = parts.next().ok_or(SpeciationError::MissingColumn {
                table: table.to_string(),
                line_no,
                expected: "'NAME:MOLWT:...'",
            })?;
            let molwt = molwt.trim_end_matches(',').trim();
            weights.insert(name.to_string(), parse_number(table, line_no, molwt)?);
        }

        debug!(table = %table, species = weights.len(), "Loaded molecular weights");
        Ok(Self { weights })
    }

    pub fn extend(&mut self, other: MolecularWeights) {
        self.weights.extend(other.weights);
    }

    pub fn get(&self, species: &str) -> Option<f64> {
        self.weights.get(species).copied()
    }

    /// Molecular weight of a species that must be present.
    pub fn require(&self, species: &str) -> Result<f64> {
        self.get(species)
            .ok_or_else(|| SpeciationError::MissingMolecularWeight {
                species: species.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

fn positions(lines: &[&str], pred: impl Fn(&str) -> bool) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| pred(l))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NML: &str = "&GC_nml\n'SPC:MOLWT:EMIS_SUR',\n!----\n'NO:30.0:EMIS',\n'CO:28.0:EMIS',\n/\n";

    #[test]
    fn test_parse_entries() {
        let mw = MolecularWeights::parse(NML, "gc").unwrap();
        assert_eq!(mw.len(), 2);
        assert_eq!(mw.get("NO"), Some(30.0));
        assert_eq!(mw.require("CO").unwrap(), 28.0);
        assert!(matches!(
            mw.require("NO2"),
            Err(SpeciationError::MissingMolecularWeight { .. })
        ));
    }

    #[test]
    fn test_header_must_be_unique() {
        let text = "'SPC:MOLWT:'\n'SPC:MOLWT:'\n/\n";
        assert!(matches!(
            MolecularWeights::parse(text, "gc"),
            Err(SpeciationError::NamelistHeader { found: 2, .. })
        ));
        assert!(matches!(
            MolecularWeights::parse("/\n", "gc"),
            Err(SpeciationError::NamelistHeader { found: 0, .. })
        ));
    }

    #[test]
    fn test_tail_required() {
        let text = "'SPC:MOLWT:'\n!---\n'NO:30.0',\n";
        assert!(matches!(
            MolecularWeights::parse(text, "gc"),
            Err(SpeciationError::NamelistTail { found: 0, .. })
        ));
    }

    #[test]
    fn test_tail_before_header() {
        let text = "/\n'SPC:MOLWT:'\n!---\n";
        assert!(matches!(
            MolecularWeights::parse(text, "gc"),
            Err(SpeciationError::NamelistOrder { .. })
        ));
    }

    #[test]
    fn test_short_entry_form() {
        // Two-field entries end with the list comma directly after the weight
        let text = "'SPC:MOLWT:'\n!\n'SO2:64.0',\n 'NH3:17.0' , \n/\n";
        let mw = MolecularWeights::parse(text, "short").unwrap();
        assert_eq!(mw.get("SO2"), Some(64.0));
        assert_eq!(mw.get("NH3"), Some(17.0));
    }

    #[test]
    fn test_later_namelist_overrides() {
        let mut a = MolecularWeights::parse(NML, "a").unwrap();
        let b = MolecularWeights::parse("'SPC:MOLWT:'\n!\n'NO:31.0',\n/\n", "b").unwrap();
        a.extend(b);
        assert_eq!(a.get("NO"), Some(31.0));
        assert_eq!(a.get("CO"), Some(28.0));
    }
}
