//! WRF-Chem to CMAQ conversion table for anthropogenic emissions.
//!
//! The table is `;`-separated with the columns
//!
//! ```text
//! WRFCHEMNAME ; CMAQNAME ; fraction ; molwgt ; isAerosol ; isVOC ; comment
//! ```
//!
//! `-` marks an empty field. Lines starting with `#` are comments and the
//! first remaining line is a header. Which fields are empty decides what a
//! row means; see [`classify_row`].

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::class::SpeciesClass;
use crate::error::{parse_number, read_table, Result, SpeciationError};

const EMPTY: &str = "-";

/// A WRF-Chem species converted one-to-one into a CMAQ species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMapping {
    pub source: String,
    pub dest: String,
    pub class: SpeciesClass,
}

/// A CMAQ organic species built from the lumped VOC total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganicLumping {
    pub dest: String,
    /// Molar fraction of the VOC total.
    pub fraction: f64,
    pub molecular_weight: f64,
}

/// One classified row of the conversion table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableRow {
    DirectMapping(DirectMapping),
    OrganicLumping(OrganicLumping),
    /// WRF-Chem species summed into the VOC total.
    VocMember(String),
    /// CMAQ aerosol species written as zeros.
    ZeroFillAerosol(String),
    /// CMAQ gas species written as zeros.
    ZeroFillGas(String),
}

/// Classify one data line of the table.
///
/// | source | dest | fraction | molwgt | aerosol | VOC | row |
/// |---|---|---|---|---|---|---|
/// | set | set | | | | | direct |
/// | `-` | | set | set | no | yes | organic |
/// | | `-` | | | no | yes | VOC member |
/// | `-` | | `-` | `-` | yes | no | zero-fill aerosol |
/// | `-` | | `-` | `-` | no | no | zero-fill gas |
///
/// Rules are tried in that order. Anything else is an error.
pub fn classify_row(table: &str, line_no: usize, line: &str) -> Result<TableRow> {
    let parts: Vec<&str> = line.split(';').map(str::trim).collect();
    if parts.len() < 6 {
        return Err(SpeciationError::MissingColumn {
            table: table.to_string(),
            line_no,
            expected: "at least 6 ';'-separated columns",
        });
    }
    let (source, dest, fraction, molwgt) = (parts[0], parts[1], parts[2], parts[3]);
    let is_aerosol = parts[4] == "True";
    let is_voc = parts[5] == "True";

    let row = if source != EMPTY && dest != EMPTY {
        TableRow::DirectMapping(DirectMapping {
            source: source.to_string(),
            dest: dest.to_string(),
            class: SpeciesClass::from_aerosol_flag(is_aerosol),
        })
    } else if source == EMPTY && fraction != EMPTY && molwgt != EMPTY && is_voc && !is_aerosol {
        TableRow::OrganicLumping(OrganicLumping {
            dest: dest.to_string(),
            fraction: parse_number(table, line_no, fraction)?,
            molecular_weight: parse_number(table, line_no, molwgt)?,
        })
    } else if dest == EMPTY && is_voc && !is_aerosol {
        TableRow::VocMember(source.to_string())
    } else if source == EMPTY && fraction == EMPTY && molwgt == EMPTY && !is_voc && is_aerosol {
        TableRow::ZeroFillAerosol(dest.to_string())
    } else if source == EMPTY && fraction == EMPTY && molwgt == EMPTY && !is_voc && !is_aerosol {
        TableRow::ZeroFillGas(dest.to_string())
    } else {
        return Err(SpeciationError::InvalidTableRow {
            table: table.to_string(),
            line_no,
            line: line.to_string(),
        });
    };
    Ok(row)
}

/// The loaded conversion table, grouped by row class in table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionTable {
    pub direct: Vec<DirectMapping>,
    pub organics: Vec<OrganicLumping>,
    pub voc_members: Vec<String>,
    /// Zero-filled placeholders, aerosols first then gases, as CMAQ
    /// expects them grouped.
    pub zero_fill: Vec<(String, SpeciesClass)>,
}

impl ConversionTable {
    /// Load and classify a table file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_table(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Classify table text; `table` names the source in errors.
    pub fn parse(text: &str, table: &str) -> Result<Self> {
        let mut rows = Vec::new();
        let mut header_seen = false;
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if !header_seen {
                header_seen = true;
                continue;
            }
            rows.push(classify_row(table, idx + 1, line)?);
        }
        Self::from_rows(rows, table)
    }

    /// Group classified rows.
    ///
    /// A destination species may be produced by only one direct or organic
    /// row.
    pub fn from_rows(rows: Vec<TableRow>, table: &str) -> Result<Self> {
        let mut out = ConversionTable::default();
        let mut aerosols = Vec::new();
        let mut gases = Vec::new();
        let mut produced = BTreeSet::new();

        for row in rows {
            match row {
                TableRow::DirectMapping(m) => {
                    if !produced.insert(m.dest.clone()) {
                        return Err(duplicate(table, &m.dest));
                    }
                    out.direct.push(m);
                }
                TableRow::OrganicLumping(o) => {
                    if !produced.insert(o.dest.clone()) {
                        return Err(duplicate(table, &o.dest));
                    }
                    out.organics.push(o);
                }
                TableRow::VocMember(name) => out.voc_members.push(name),
                TableRow::ZeroFillAerosol(name) => aerosols.push((name, SpeciesClass::Aerosol)),
                TableRow::ZeroFillGas(name) => gases.push((name, SpeciesClass::Gas)),
            }
        }
        out.zero_fill = aerosols;
        out.zero_fill.extend(gases);

        debug!(
            table = %table,
            direct = out.direct.len(),
            organics = out.organics.len(),
            voc_members = out.voc_members.len(),
            zero_fill = out.zero_fill.len(),
            "Loaded species conversion table"
        );
        Ok(out)
    }

    /// Drop direct mappings and VOC members whose source species is not in
    /// `available`, logging a warning for each.
    pub fn retain_available(&mut self, available: &BTreeSet<String>, table: &str) {
        self.direct.retain(|m| {
            let keep = available.contains(&m.source);
            if !keep {
                warn!(
                    species = %m.source,
                    table = %table,
                    "Species listed as directly convertible but not found in the emissions file; ignoring"
                );
            }
            keep
        });
        self.voc_members.retain(|name| {
            let keep = available.contains(name);
            if !keep {
                warn!(
                    species = %name,
                    table = %table,
                    "Species listed as a VOC but not found in the emissions file; ignoring"
                );
            }
            keep
        });
    }

    /// WRF-Chem species the table needs from the input files.
    pub fn source_species(&self) -> Vec<&str> {
        self.direct
            .iter()
            .map(|m| m.source.as_str())
            .chain(self.voc_members.iter().map(String::as_str))
            .collect()
    }
}

fn duplicate(table: &str, species: &str) -> SpeciationError {
    SpeciationError::DuplicateDestination {
        table: table.to_string(),
        species: species.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> Result<TableRow> {
        classify_row("test", 1, line)
    }

    #[test]
    fn test_classify_direct() {
        let row = classify("E_NO ; NO ; - ; - ; False ; False ; x").unwrap();
        assert_eq!(
            row,
            TableRow::DirectMapping(DirectMapping {
                source: "E_NO".into(),
                dest: "NO".into(),
                class: SpeciesClass::Gas,
            })
        );
        let row = classify("E_PM25J ; APM25J ; - ; - ; True ; False ; x").unwrap();
        assert!(matches!(row, TableRow::DirectMapping(m) if m.class == SpeciesClass::Aerosol));
    }

    #[test]
    fn test_classify_organic() {
        let row = classify("- ; PAR ; 0.5 ; 14.0 ; False ; True ; x").unwrap();
        assert_eq!(
            row,
            TableRow::OrganicLumping(OrganicLumping {
                dest: "PAR".into(),
                fraction: 0.5,
                molecular_weight: 14.0,
            })
        );
    }

    #[test]
    fn test_classify_voc_member_and_zero_fill() {
        assert_eq!(
            classify("E_ETH ; - ; - ; - ; False ; True ; x").unwrap(),
            TableRow::VocMember("E_ETH".into())
        );
        assert_eq!(
            classify("- ; ANAJ ; - ; - ; True ; False ; x").unwrap(),
            TableRow::ZeroFillAerosol("ANAJ".into())
        );
        assert_eq!(
            classify("- ; SULF ; - ; - ; False ; False ; x").unwrap(),
            TableRow::ZeroFillGas("SULF".into())
        );
    }

    #[test]
    fn test_unclassifiable_rows_fail() {
        // Aerosol VOC with a destination but no source
        assert!(matches!(
            classify("- ; XYZ ; - ; - ; True ; True ; x"),
            Err(SpeciationError::InvalidTableRow { .. })
        ));
        // Organic missing its molecular weight
        assert!(matches!(
            classify("- ; PAR ; 0.5 ; - ; False ; True ; x"),
            Err(SpeciationError::InvalidTableRow { .. })
        ));
        assert!(matches!(
            classify("E_NO ; NO"),
            Err(SpeciationError::MissingColumn { .. })
        ));
        assert!(matches!(
            classify("- ; PAR ; half ; 14.0 ; False ; True ; x"),
            Err(SpeciationError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_skips_comments_and_header() {
        let text = "# comment\nheader line\n\nE_NO ; NO ; - ; - ; False ; False ; x\n";
        let table = ConversionTable::parse(text, "t").unwrap();
        assert_eq!(table.direct.len(), 1);
    }

    #[test]
    fn test_duplicate_destination_rejected() {
        let text = "h\nE_NO ; NO ; - ; - ; False ; False ; x\n- ; NO ; 1 ; 30 ; False ; True ; x\n";
        assert!(matches!(
            ConversionTable::parse(text, "t"),
            Err(SpeciationError::DuplicateDestination { .. })
        ));
    }

    #[test]
    fn test_zero_fill_aerosols_first() {
        let text = "h\n- ; SULF ; - ; - ; False ; False ; x\n- ; ANAJ ; - ; - ; True ; False ; x\n";
        let table = ConversionTable::parse(text, "t").unwrap();
        assert_eq!(table.zero_fill[0], ("ANAJ".to_string(), SpeciesClass::Aerosol));
        assert_eq!(table.zero_fill[1], ("SULF".to_string(), SpeciesClass::Gas));
    }
}
