//! IOAPI-style output datasets: merged emissions, fire emissions and
//! initial/boundary conditions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use cmaq_common::time::HOURLY_TSTEP;
use cmaq_common::Tflag;
use dataset::{write_dataset, AttrValue, MemoryDataset, Variable};
use regrid::SurfZoneFractions;
use speciation::SpeciesClass;
use tracing::info;

use crate::field::EmissionsField;
use crate::{EmissionsError, Result};

/// Global attributes carried over from the MCIP header.
pub const IOAPI_ATTRIBUTES: [&str; 32] = [
    "IOAPI_VERSION",
    "EXEC_ID",
    "FTYPE",
    "CDATE",
    "CTIME",
    "WDATE",
    "WTIME",
    "SDATE",
    "STIME",
    "TSTEP",
    "NTHIK",
    "NCOLS",
    "NROWS",
    "NLAYS",
    "NVARS",
    "GDTYP",
    "P_ALP",
    "P_BET",
    "P_GAM",
    "XCENT",
    "YCENT",
    "XORIG",
    "YORIG",
    "XCELL",
    "YCELL",
    "VGTYP",
    "VGTOP",
    "VGLVLS",
    "GDNAM",
    "UPNAM",
    "VAR-LIST",
    "FILEDESC",
];

const NAME_WIDTH: usize = 16;
const DESC_WIDTH: usize = 80;

/// Left-justify `s` in a field of `width` characters.
pub fn pad(s: &str, width: usize) -> String {
    format!("{:<width$}", s, width = width)
}

/// `VAR-LIST`: every name padded to 16 characters, concatenated.
pub fn var_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names.into_iter().map(|n| pad(n, NAME_WIDTH)).collect()
}

/// `TFLAG[t, v, :] = (YYYYDDD, HHMMSS)`, repeated for every variable.
pub fn tflag_variable(tflags: &[Tflag], nvars: usize) -> Result<Variable> {
    let mut data = Vec::with_capacity(tflags.len() * nvars * 2);
    for flag in tflags {
        for _ in 0..nvars {
            data.push(flag.yyyyddd as f64);
            data.push(flag.hhmmss as f64);
        }
    }
    Ok(Variable::new(
        "TFLAG",
        &["TSTEP", "VAR", "DATE-TIME"],
        &[tflags.len(), nvars, 2],
        data,
    )?
    .with_attr("long_name", pad("TFLAG", NAME_WIDTH))
    .with_attr("units", "<YYYYDDD,HHMMSS>")
    .with_attr("var_desc", "Timestep-valid flags:  (1) YYYYDDD or (2) HHMMSS "))
}

/// Header attributes shared by every file written for a domain.
#[derive(Debug, Clone, Default)]
pub struct IoapiHeader {
    attributes: BTreeMap<String, AttrValue>,
}

impl IoapiHeader {
    /// Keep only the IOAPI attributes of an MCIP file header.
    pub fn from_mcip(attributes: &BTreeMap<String, AttrValue>) -> Self {
        let attributes = attributes
            .iter()
            .filter(|(k, _)| IOAPI_ATTRIBUTES.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { attributes }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    fn apply(&self, ds: &mut MemoryDataset) {
        for (k, v) in &self.attributes {
            ds.set_attribute(k, v.clone());
        }
    }
}

/// How field values are described in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Emission,
    Concentration,
}

impl Quantity {
    fn units(self, class: SpeciesClass) -> &'static str {
        match self {
            Quantity::Emission => class.emission_units(),
            Quantity::Concentration => class.concentration_units(),
        }
    }

    fn description(self, name: &str) -> String {
        match self {
            Quantity::Emission => format!("Emissions of {}", name),
            Quantity::Concentration => format!("Variable {}", name),
        }
    }
}

fn assemble(
    field: &EmissionsField,
    tflags: &[Tflag],
    header: &IoapiHeader,
    quantity: Quantity,
    perimeter: bool,
) -> Result<MemoryDataset> {
    let shape = field.shape();
    if tflags.len() != shape.times {
        return Err(EmissionsError::shape_mismatch("TFLAG steps", shape.times, tflags.len()));
    }
    let (dims, dim_shape): (Vec<&str>, Vec<usize>) = if perimeter {
        (
            vec!["TSTEP", "LAY", "PERIM"],
            vec![shape.times, shape.layers, shape.frame_len()],
        )
    } else {
        (vec!["TSTEP", "LAY", "ROW", "COL"], shape.dims().to_vec())
    };

    let mut ds = MemoryDataset::new("output");
    header.apply(&mut ds);
    ds.insert_variable("TFLAG", tflag_variable(tflags, field.len())?)?;
    for (name, species) in field.iter() {
        let var = Variable::new(name, &dims, &dim_shape, species.values.clone())?
            .with_attr("long_name", pad(name, NAME_WIDTH))
            .with_attr("units", pad(quantity.units(species.class), NAME_WIDTH))
            .with_attr("var_desc", pad(&quantity.description(name), DESC_WIDTH));
        ds.insert_variable(name, var)?;
    }

    ds.set_attribute("VAR-LIST", var_list(field.species_names()));
    ds.set_attribute("NVARS", field.len() as i64);
    ds.set_attribute("NLAYS", shape.layers as i64);
    ds.set_attribute("HISTORY", "");
    Ok(ds)
}

/// Merged hourly emissions for one date.
pub fn emissions_dataset(field: &EmissionsField, date: NaiveDate, header: &IoapiHeader) -> Result<MemoryDataset> {
    let tflags = Tflag::for_day(date);
    let mut ds = assemble(field, &tflags, header, Quantity::Emission, false)?;
    ds.set_attribute("SDATE", tflags[0].yyyyddd);
    ds.set_attribute("STIME", 0);
    ds.set_attribute("TSTEP", HOURLY_TSTEP);
    Ok(ds)
}

/// Time-independent gridded fire emissions.
pub fn fire_dataset(field: &EmissionsField, header: &IoapiHeader) -> Result<MemoryDataset> {
    let tflags = vec![Tflag::new(0, 0); field.shape().times];
    let mut ds = assemble(field, &tflags, header, Quantity::Emission, false)?;
    ds.set_attribute("SDATE", 0);
    ds.set_attribute("STIME", 0);
    ds.set_attribute("TSTEP", 0);
    Ok(ds)
}

/// Initial (`perimeter = false`) or boundary conditions at `tflags`, one
/// per time step of `field`.
pub fn conditions_dataset(
    field: &EmissionsField,
    tflags: &[Tflag],
    header: &IoapiHeader,
    perimeter: bool,
) -> Result<MemoryDataset> {
    let first = tflags
        .first()
        .copied()
        .ok_or_else(|| EmissionsError::shape_mismatch("TFLAG steps", field.shape().times, 0))?;
    let mut ds = assemble(field, tflags, header, Quantity::Concentration, perimeter)?;
    ds.set_attribute("SDATE", first.yyyyddd);
    ds.set_attribute("STIME", first.hhmmss);
    ds.set_attribute("TSTEP", HOURLY_TSTEP);
    if perimeter {
        ds.set_attribute("FTYPE", 2);
        ds.set_attribute("NTHIK", 1);
    }
    Ok(ds)
}

/// Static open-ocean and surf-zone fractions for the sea-salt module.
///
/// `header` should come from GRIDCRO2D. The single time step carries a
/// zero TFLAG.
pub fn surf_zone_dataset(fractions: &SurfZoneFractions, header: &IoapiHeader) -> Result<MemoryDataset> {
    let dims = ["TSTEP", "LAY", "ROW", "COL"];
    let shape = [1, 1, fractions.rows(), fractions.cols()];
    let names = ["OPEN", "SURF"];

    let mut ds = MemoryDataset::new("surfzone");
    header.apply(&mut ds);
    ds.insert_variable("TFLAG", tflag_variable(&[Tflag::new(0, 0)], names.len())?)?;
    for (name, values) in names.into_iter().zip([&fractions.open, &fractions.surf]) {
        let var = Variable::new(name, &dims, &shape, values.clone())?
            .with_attr("long_name", pad(name, NAME_WIDTH))
            .with_attr("units", pad("UNKNOWN", NAME_WIDTH))
            .with_attr("var_desc", pad(name, DESC_WIDTH));
        ds.insert_variable(name, var)?;
    }

    ds.set_attribute("VAR-LIST", var_list(names));
    ds.set_attribute("NVARS", names.len() as i64);
    ds.set_attribute("NLAYS", 1);
    ds.set_attribute("HISTORY", "");
    ds.set_attribute("VGTYP", 1);
    ds.set_attribute("SDATE", -635);
    ds.set_attribute("VGLVLS", vec![1.0, 0.0]);
    Ok(ds)
}

/// Write a dataset, replacing any previous file.
pub fn write_output(path: &Path, ds: &MemoryDataset) -> Result<()> {
    write_dataset(path, ds)?;
    info!(path = %path.display(), variables = ds.variables.len(), "Wrote output");
    Ok(())
}

/// File names of the generated outputs within a chemistry directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNames {
    pub domain: String,
    pub grid: String,
    pub mechanism: String,
}

impl OutputNames {
    pub fn merged_emissions(&self, dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(format!(
            "mergedEmis_{}_{}_{}.json",
            date.format("%Y-%m-%d"),
            self.domain,
            self.mechanism
        ))
    }

    pub fn fire_emissions(&self, dir: &Path) -> PathBuf {
        dir.join(format!("fire_emis_{}.json", self.domain))
    }

    pub fn initial_conditions(&self, dir: &Path) -> PathBuf {
        dir.join(format!("ICON.{}.{}.{}.json", self.domain, self.grid, self.mechanism))
    }

    pub fn boundary_conditions(&self, dir: &Path) -> PathBuf {
        dir.join(format!("BCON.{}.{}.{}.json", self.domain, self.grid, self.mechanism))
    }

    /// Surf-zone file; lives at the top of the CTM directory, not per date.
    pub fn surf_zone(&self, ctm_dir: &Path) -> PathBuf {
        ctm_dir.join(format!("surfzone_{}.json", self.domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{EmissionsAccumulator, FieldShape};
    use dataset::Dataset;

    fn field(times: usize) -> EmissionsField {
        EmissionsAccumulator::with_species(
            FieldShape::new(times, 1, 2, 2),
            [("NO", SpeciesClass::Gas), ("AECJ", SpeciesClass::Aerosol)],
        )
        .finalize()
    }

    fn header() -> IoapiHeader {
        let mut attrs = BTreeMap::new();
        attrs.insert("GDNAM".to_string(), AttrValue::from("AUS12"));
        attrs.insert("XCELL".to_string(), AttrValue::from(12000.0));
        attrs.insert("HISTORY".to_string(), AttrValue::from("mcip run"));
        IoapiHeader::from_mcip(&attrs)
    }

    #[test]
    fn test_pad_and_var_list() {
        assert_eq!(pad("NO", 4), "NO  ");
        assert_eq!(var_list(["NO", "CO"]).len(), 32);
        assert!(var_list(["NO", "CO"]).starts_with("NO              CO"));
    }

    #[test]
    fn test_tflag_repeats_per_variable() {
        let flags = [Tflag::new(2024001, 0), Tflag::new(2024001, 10000)];
        let var = tflag_variable(&flags, 3).unwrap();
        assert_eq!(var.shape, vec![2, 3, 2]);
        assert_eq!(var.get(&[1, 2, 1]), Some(10000.0));
        assert_eq!(var.get(&[0, 1, 0]), Some(2024001.0));
    }

    #[test]
    fn test_emissions_dataset_header() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let ds = emissions_dataset(&field(25), date, &header()).unwrap();
        assert_eq!(ds.attr_f64("SDATE").unwrap(), 2024032.0);
        assert_eq!(ds.attr_f64("TSTEP").unwrap(), 10000.0);
        assert_eq!(ds.attr_f64("NVARS").unwrap(), 2.0);
        assert_eq!(ds.attribute("GDNAM").and_then(AttrValue::as_str), Some("AUS12"));
        // non-IOAPI attributes are not copied
        assert_eq!(ds.attribute("HISTORY").and_then(AttrValue::as_str), Some(""));
        let expected = format!("{:<16}{:<16}", "AECJ", "NO");
        assert_eq!(ds.attribute("VAR-LIST").and_then(AttrValue::as_str), Some(expected.as_str()));

        let aec = ds.require_variable("AECJ").unwrap();
        assert_eq!(aec.units(), Some("g/s"));
        let raw = aec.attr("units").and_then(AttrValue::as_str).unwrap();
        assert_eq!(raw.len(), 16);
        let no = ds.require_variable("NO").unwrap();
        assert_eq!(no.units(), Some("moles/s"));
        assert_eq!(ds.require_variable("TFLAG").unwrap().shape, vec![25, 2, 2]);
    }

    #[test]
    fn test_emissions_dataset_wrong_steps() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(matches!(
            emissions_dataset(&field(24), date, &header()),
            Err(EmissionsError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_boundary_uses_perimeter_dims() {
        let ds = conditions_dataset(&field(1), &[Tflag::new(2024032, 0)], &header(), true).unwrap();
        let no = ds.require_variable("NO").unwrap();
        assert_eq!(no.dims, vec!["TSTEP", "LAY", "PERIM"]);
        assert_eq!(no.shape, vec![1, 1, 4]);
        assert_eq!(no.units(), Some("ppmV"));
    }

    #[test]
    fn test_surf_zone_dataset() {
        let grid = test_utils::regular_grid(0.0, 0.0, 1.0, 1.0, 2, 3);
        let coast = regrid::Coastline::default();
        let fractions = regrid::surf_zone_fractions(&grid, &coast).unwrap();
        let ds = surf_zone_dataset(&fractions, &header()).unwrap();

        let open = ds.require_variable("OPEN").unwrap();
        assert_eq!(open.shape, vec![1, 1, 2, 3]);
        assert!(open.values().iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert_eq!(ds.require_variable("SURF").unwrap().values(), &[0.0; 6]);
        assert_eq!(ds.require_variable("TFLAG").unwrap().shape, vec![1, 2, 2]);
        assert_eq!(ds.attr_f64("NVARS").unwrap(), 2.0);
        assert_eq!(ds.attr_f64("SDATE").unwrap(), -635.0);
        assert_eq!(ds.attr_f64_vec("VGLVLS").unwrap(), vec![1.0, 0.0]);
        assert_eq!(ds.attribute("GDNAM").and_then(AttrValue::as_str), Some("AUS12"));
    }

    #[test]
    fn test_output_names() {
        let names = OutputNames {
            domain: "d01".into(),
            grid: "AUS12".into(),
            mechanism: "cb6r3_ae7".into(),
        };
        let dir = Path::new("/ctm/2024-02-01/d01");
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(
            names.merged_emissions(dir, date),
            dir.join("mergedEmis_2024-02-01_d01_cb6r3_ae7.json")
        );
        assert_eq!(names.boundary_conditions(dir), dir.join("BCON.d01.AUS12.cb6r3_ae7.json"));
        assert_eq!(names.surf_zone(Path::new("/ctm")), Path::new("/ctm/surfzone_d01.json"));
    }
}
