//! MCIP grid and meteorology files for one domain and date.
//!
//! MCIP writes `<TYPE>_<suffix>` files into a per-date, per-domain
//! directory. The suffix is usually the grid name plus a layer count and is
//! discovered from the `GRIDCRO2D_*` file when not configured.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cmaq_common::{CellGeometry, CurvilinearGrid, Tflag};
use dataset::{open_dataset, AttrValue, Dataset, MemoryDataset};
use projection::IoapiGridDef;
use regrid::VerticalColumn;
use tracing::{debug, warn};

use crate::discover::files_with_prefix;
use crate::{EmissionsError, Result};

/// MCIP output file types used here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McipFile {
    GridCro2d,
    GridDot2d,
    GridBdy2d,
    MetCro2d,
    MetCro3d,
}

impl McipFile {
    pub fn prefix(self) -> &'static str {
        match self {
            McipFile::GridCro2d => "GRIDCRO2D",
            McipFile::GridDot2d => "GRIDDOT2D",
            McipFile::GridBdy2d => "GRIDBDY2D",
            McipFile::MetCro2d => "METCRO2D",
            McipFile::MetCro3d => "METCRO3D",
        }
    }
}

/// Location of one set of MCIP files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McipFiles {
    dir: PathBuf,
    suffix: String,
}

impl McipFiles {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    /// Find the suffix from the `GRIDCRO2D_*` file in `dir`.
    pub fn discover(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let found = files_with_prefix(&dir, "GRIDCRO2D_")?;
        let first = found.first().ok_or_else(|| EmissionsError::NoInputFiles {
            what: "GRIDCRO2D".to_string(),
            dir: dir.clone(),
        })?;
        if found.len() > 1 {
            warn!(
                dir = %dir.display(),
                count = found.len(),
                suffix = %first.rest,
                "Several GRIDCRO2D files found; using the first"
            );
        }
        let suffix = first.rest.clone();
        Ok(Self { dir, suffix })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn path(&self, file: McipFile) -> PathBuf {
        self.dir.join(format!("{}_{}", file.prefix(), self.suffix))
    }

    pub fn exists(&self, file: McipFile) -> bool {
        self.path(file).exists()
    }

    /// Open a required file.
    pub fn open(&self, file: McipFile) -> Result<MemoryDataset> {
        let path = self.path(file);
        if !path.exists() {
            return Err(EmissionsError::missing_file(file.prefix(), &path));
        }
        Ok(open_dataset(&path)?)
    }
}

/// Horizontal and vertical description of a CMAQ domain.
#[derive(Debug, Clone)]
pub struct McipDomain {
    /// Cell centres and corners.
    pub grid: CurvilinearGrid,
    pub geometry: CellGeometry,
    pub layers: usize,
    /// Full sigma levels, `layers + 1` values.
    pub sigma: Vec<f64>,
    /// Model-top pressure in Pa.
    pub top_pressure: f64,
    /// Global attributes of METCRO3D, reused for output headers.
    pub attributes: BTreeMap<String, AttrValue>,
}

impl McipDomain {
    /// Read GRIDCRO2D, GRIDDOT2D and METCRO3D.
    ///
    /// Corners come from GRIDDOT2D when present and are otherwise computed
    /// from the IOAPI projection attributes.
    pub fn load(files: &McipFiles) -> Result<Self> {
        let cro = files.open(McipFile::GridCro2d)?;
        let met = files.open(McipFile::MetCro3d)?;

        let rows = cro.require_dimension("ROW")?;
        let cols = cro.require_dimension("COL")?;
        let lat = cro.require_variable("LAT")?.values().to_vec();
        let lon = cro.require_variable("LON")?.values().to_vec();
        let centres = CurvilinearGrid::new(rows, cols, lat, lon)?;

        let grid = if files.exists(McipFile::GridDot2d) {
            let dot = files.open(McipFile::GridDot2d)?;
            let latd = dot.require_variable("LATD")?.values().to_vec();
            let lond = dot.require_variable("LOND")?.values().to_vec();
            centres.with_corners(latd, lond)?
        } else {
            debug!(dir = %files.dir().display(), "No GRIDDOT2D file; projecting cell corners");
            let projected = grid_def(&cro, rows, cols)?.to_grid()?;
            let mut corner_lat = Vec::with_capacity((rows + 1) * (cols + 1));
            let mut corner_lon = Vec::with_capacity((rows + 1) * (cols + 1));
            for r in 0..=rows {
                for c in 0..=cols {
                    let (la, lo) = projected.corner(r, c)?;
                    corner_lat.push(la);
                    corner_lon.push(lo);
                }
            }
            centres.with_corners(corner_lat, corner_lon)?
        };

        let geometry = CellGeometry::new(cro.attr_f64("XCELL")?, cro.attr_f64("YCELL")?)?;
        let layers = met.require_dimension("LAY")?;
        let sigma = met.attr_f64_vec("VGLVLS")?;
        if sigma.len() != layers + 1 {
            return Err(EmissionsError::shape_mismatch("VGLVLS", layers + 1, sigma.len()));
        }
        let top_pressure = met.attr_f64("VGTOP")?;

        debug!(rows, cols, layers, "Loaded MCIP domain");
        Ok(Self {
            grid,
            geometry,
            layers,
            sigma,
            top_pressure,
            attributes: met.attributes.clone(),
        })
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }
}

fn grid_def(cro: &MemoryDataset, rows: usize, cols: usize) -> Result<IoapiGridDef> {
    let gdtyp = cro
        .require_attribute("GDTYP")?
        .as_i64()
        .ok_or_else(|| EmissionsError::invalid_input(cro.source(), "GDTYP is not an integer"))?;
    Ok(IoapiGridDef {
        gdtyp: gdtyp as i32,
        p_alp: cro.attr_f64("P_ALP")?,
        p_bet: cro.attr_f64("P_BET")?,
        p_gam: cro.attr_f64("P_GAM")?,
        xcent: cro.attr_f64("XCENT")?,
        ycent: cro.attr_f64("YCENT")?,
        xorig: cro.attr_f64("XORIG")?,
        yorig: cro.attr_f64("YORIG")?,
        xcell: cro.attr_f64("XCELL")?,
        ycell: cro.attr_f64("YCELL")?,
        ncols: cols,
        nrows: rows,
    })
}

/// `TFLAG[:, 0, :]` of an IOAPI file.
pub fn read_tflags(ds: &impl Dataset) -> Result<Vec<Tflag>> {
    let var = ds.require_variable("TFLAG")?;
    let per_step = var.frame_len();
    if var.shape.len() != 3 || per_step < 2 {
        return Err(EmissionsError::invalid_input(
            ds.source(),
            format!("TFLAG has shape {:?}", var.shape),
        ));
    }
    Ok((0..var.frames())
        .map(|t| {
            let base = t * per_step;
            Tflag::new(var.data[base] as i32, var.data[base + 1] as i32)
        })
        .collect())
}

/// One vertical column per cell from METCRO3D `ZH` (time-mean layer
/// heights) and GRIDCRO2D `HT` (terrain), row-major.
pub fn vertical_columns(met3d: &impl Dataset, cro: &impl Dataset) -> Result<Vec<VerticalColumn>> {
    let zh = met3d.require_variable("ZH")?;
    let ht = cro.require_variable("HT")?;
    let cells = ht.len();
    if zh.shape.len() != 4 || zh.shape[2] * zh.shape[3] != cells {
        return Err(EmissionsError::shape_mismatch(
            "ZH cells",
            cells,
            zh.shape.get(2..).map(|s| s.iter().product::<usize>()).unwrap_or(0),
        ));
    }
    let (times, layers) = (zh.shape[0], zh.shape[1]);
    if times == 0 {
        return Err(EmissionsError::invalid_input(met3d.source(), "ZH has no time steps"));
    }

    let mut mean = vec![0.0; layers * cells];
    for t in 0..times {
        for (acc, &v) in mean.iter_mut().zip(&zh.data[t * layers * cells..(t + 1) * layers * cells]) {
            *acc += v;
        }
    }
    for v in mean.iter_mut() {
        *v /= times as f64;
    }

    (0..cells)
        .map(|cell| {
            let heights = (0..layers).map(|k| mean[k * cells + cell]).collect();
            Ok(VerticalColumn::new(heights, ht.data[cell])?)
        })
        .collect()
}
