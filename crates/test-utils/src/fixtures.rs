//! Common test fixtures for cmaq-prep tests.
//!
//! Species tables as they appear on disk, and a builder that writes a
//! consistent set of MCIP grid/meteorology files for a small domain.

use std::fs;
use std::path::{Path, PathBuf};

use dataset::{write_dataset, MemoryDataset};

/// Write `contents` to `dir/name` and return the full path.
pub fn write_text_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture directory");
    }
    fs::write(&path, contents).expect("write fixture file");
    path
}

/// Write a dataset to `dir/name` and return the full path.
pub fn write_dataset_file(dir: &Path, name: &str, dataset: &MemoryDataset) -> PathBuf {
    let path = dir.join(name);
    write_dataset(&path, dataset).expect("write fixture dataset");
    path
}

/// Species tables in their on-disk formats.
pub mod tables {
    /// WRF-Chem to CMAQ conversion table.
    ///
    /// Exercises every row class; `E_MISSING` and `E_ABSENTVOC` are not in
    /// the matching emissions fixture, and `CO` is both converted directly
    /// and listed for zero-fill.
    pub const ANTHROPOGENIC: &str = "\
# WRF-Chem to CMAQ speciation
WRFCHEMNAME ; CMAQNAME ; fraction ; molwgt ; isAerosol ; isVOC ; comment
E_NO        ; NO       ; -        ; -      ; False     ; False ; nitric oxide
E_CO        ; CO       ; -        ; -      ; False     ; False ; carbon monoxide
E_PM25J     ; APM25J   ; -        ; -      ; True      ; False ; fine PM
E_MISSING   ; XYZ      ; -        ; -      ; False     ; False ; not in the input
-           ; PAR      ; 0.5      ; 14.0   ; False     ; True  ; paraffin
-           ; OLE      ; 0.25     ; 28.0   ; False     ; True  ; olefin
E_ETH       ; -        ; -        ; -      ; False     ; True  ; ethane
E_HC3       ; -        ; -        ; -      ; False     ; True  ; alkanes
E_ABSENTVOC ; -        ; -        ; -      ; False     ; True  ; not in the input
-           ; ANAJ     ; -        ; -      ; True      ; False ; sodium
-           ; SULF     ; -        ; -      ; False     ; False ; sulfuric acid
-           ; CO       ; -        ; -      ; False     ; False ; already converted
";

    /// GFAS to CMAQ fire species map.
    pub const FIRE_SPECIES_MAP: &str = "\
GFAS ; CMAQ ; coefficients
cofire ; CO ; 1.0

noxfire ; NO,NO2 ; 0.25,0.75
bcfire ; AECJ,AECI ; 0.8,0.2
";

    /// CMAQ gas-phase namelist with molecular weights.
    pub const GC_NAMELIST: &str = "\
&GC_nml

n_gc_spc = 4,

GC_SPECIES_DATA =
'SPC:MOLWT:EMIS_SUR:EMIS_FAC',
!-----------------------------
'NO:30.0:EMIS:1.0',
'NO2:46.0:EMIS:1.0',
'CO:28.0:EMIS:1.0',
'PAR:14.0:EMIS:1.0',
/
";

    /// Global CTM (MOZART/CAM-chem) to CMAQ boundary-condition species map.
    pub const BCON_SPECIES_MAP: &str = "\
MOZART ; description ; CMAQ ; coefficients
O3 ; ozone ; O3 ; 1.0
CO ; carbon monoxide ; CO ; 1.0
SO4_VMR_inst ; sulfate ; ASO4J,ASO4I ; 0.9,0.1
NOX_ABSENT ; not in the input ; NO2 ; 1.0
";
}

/// MCIP output fixtures.
pub mod mcip {
    use std::path::Path;

    use cmaq_common::{CurvilinearGrid, Tflag};
    use dataset::{MemoryDataset, Variable};

    use super::write_dataset_file;

    /// Parameters of a synthetic MCIP domain.
    #[derive(Debug, Clone)]
    pub struct McipFixture {
        pub grid: CurvilinearGrid,
        /// Cell size in metres.
        pub cell_size: f64,
        /// Layer mid-point heights above ground (ZH), one per layer.
        pub layer_heights: Vec<f64>,
        pub terrain: f64,
        pub surface_pressure: f64,
        /// Full sigma levels, `layers + 1` values.
        pub sigma: Vec<f64>,
        pub top_pressure: f64,
        pub tflags: Vec<Tflag>,
    }

    impl McipFixture {
        pub fn layers(&self) -> usize {
            self.layer_heights.len()
        }

        fn ioapi_attributes(&self, ds: MemoryDataset) -> MemoryDataset {
            let sdate = self.tflags.first().map(|t| t.yyyyddd).unwrap_or(0);
            ds.with_attribute("XCELL", self.cell_size)
                .with_attribute("YCELL", self.cell_size)
                .with_attribute("NROWS", self.grid.rows() as i64)
                .with_attribute("NCOLS", self.grid.cols() as i64)
                .with_attribute("NLAYS", self.layers() as i64)
                .with_attribute("GDTYP", 2i64)
                .with_attribute("GDNAM", "TESTGRID")
                .with_attribute("SDATE", sdate as i64)
                .with_attribute("STIME", 0i64)
                .with_attribute("TSTEP", 10000i64)
                .with_attribute("VGLVLS", self.sigma.clone())
                .with_attribute("VGTOP", self.top_pressure)
        }

        fn surface_variable(&self, name: &str, data: Vec<f64>) -> Variable {
            Variable::new(
                name,
                &["TSTEP", "LAY", "ROW", "COL"],
                &[1, 1, self.grid.rows(), self.grid.cols()],
                data,
            )
            .expect("surface variable shape")
        }

        /// GRIDCRO2D: LAT, LON, HT.
        pub fn gridcro2d(&self) -> MemoryDataset {
            let n = self.grid.len();
            self.ioapi_attributes(MemoryDataset::new("GRIDCRO2D"))
                .with_variable("LAT", self.surface_variable("LAT", self.grid.lat_values().to_vec()))
                .and_then(|d| {
                    d.with_variable("LON", self.surface_variable("LON", self.grid.lon_values().to_vec()))
                })
                .and_then(|d| d.with_variable("HT", self.surface_variable("HT", vec![self.terrain; n])))
                .expect("GRIDCRO2D fixture")
        }

        /// GRIDDOT2D: LATD, LOND.
        pub fn griddot2d(&self) -> MemoryDataset {
            let (rows, cols) = (self.grid.rows() + 1, self.grid.cols() + 1);
            let mut latd = Vec::with_capacity(rows * cols);
            let mut lond = Vec::with_capacity(rows * cols);
            for r in 0..rows {
                for c in 0..cols {
                    let (lat, lon) = self.grid.corner(r, c).expect("fixture grid has corners");
                    latd.push(lat);
                    lond.push(lon);
                }
            }
            let dims = ["TSTEP", "LAY", "ROW", "COL"];
            let shape = [1, 1, rows, cols];
            self.ioapi_attributes(MemoryDataset::new("GRIDDOT2D"))
                .with_variable("LATD", Variable::new("LATD", &dims, &shape, latd).expect("LATD"))
                .and_then(|d| {
                    d.with_variable("LOND", Variable::new("LOND", &dims, &shape, lond).expect("LOND"))
                })
                .expect("GRIDDOT2D fixture")
        }

        /// METCRO3D: ZH and ZF for every time step.
        pub fn metcro3d(&self) -> MemoryDataset {
            let (nt, nz) = (self.tflags.len(), self.layers());
            let cells = self.grid.len();
            let mut zh = Vec::with_capacity(nt * nz * cells);
            let mut zf = Vec::with_capacity(nt * nz * cells);
            for _ in 0..nt {
                for k in 0..nz {
                    let top = if k + 1 < nz {
                        (self.layer_heights[k] + self.layer_heights[k + 1]) / 2.0
                    } else {
                        self.layer_heights[k] * 1.5
                    };
                    zh.extend(std::iter::repeat(self.layer_heights[k]).take(cells));
                    zf.extend(std::iter::repeat(top).take(cells));
                }
            }
            let dims = ["TSTEP", "LAY", "ROW", "COL"];
            let shape = [nt, nz, self.grid.rows(), self.grid.cols()];
            self.ioapi_attributes(MemoryDataset::new("METCRO3D"))
                .with_variable("ZH", Variable::new("ZH", &dims, &shape, zh).expect("ZH"))
                .and_then(|d| d.with_variable("ZF", Variable::new("ZF", &dims, &shape, zf).expect("ZF")))
                .expect("METCRO3D fixture")
        }

        /// METCRO2D: PRSFC and TFLAG.
        pub fn metcro2d(&self) -> MemoryDataset {
            let nt = self.tflags.len();
            let cells = self.grid.len();
            let prsfc = vec![self.surface_pressure; nt * cells];
            let mut tflag = Vec::with_capacity(nt * 2);
            for t in &self.tflags {
                tflag.push(t.yyyyddd as f64);
                tflag.push(t.hhmmss as f64);
            }
            self.ioapi_attributes(MemoryDataset::new("METCRO2D"))
                .with_variable(
                    "PRSFC",
                    Variable::new(
                        "PRSFC",
                        &["TSTEP", "LAY", "ROW", "COL"],
                        &[nt, 1, self.grid.rows(), self.grid.cols()],
                        prsfc,
                    )
                    .expect("PRSFC"),
                )
                .and_then(|d| {
                    d.with_variable(
                        "TFLAG",
                        Variable::new("TFLAG", &["TSTEP", "VAR", "DATE-TIME"], &[nt, 1, 2], tflag)
                            .expect("TFLAG"),
                    )
                })
                .expect("METCRO2D fixture")
        }

        /// Perimeter cell centres, one cell thick, in IOAPI order
        /// (south, east, north, west).
        pub fn perimeter(&self) -> (Vec<f64>, Vec<f64>) {
            let (rows, cols) = (self.grid.rows() as isize, self.grid.cols() as isize);
            let (lat00, lon00) = (self.grid.lat(0, 0), self.grid.lon(0, 0));
            let dlat = if rows > 1 { self.grid.lat(1, 0) - lat00 } else { 0.0 };
            let dlon = if cols > 1 { self.grid.lon(0, 1) - lon00 } else { 0.0 };
            let mut cells: Vec<(isize, isize)> = Vec::new();
            cells.extend((0..=cols).map(|c| (-1, c)));
            cells.extend((0..=rows).map(|r| (r, cols)));
            cells.extend((-1..cols).map(|c| (rows, c)));
            cells.extend((-1..rows).map(|r| (r, -1)));
            cells
                .into_iter()
                .map(|(r, c)| (lat00 + r as f64 * dlat, lon00 + c as f64 * dlon))
                .unzip()
        }

        /// GRIDBDY2D: perimeter LAT and LON.
        pub fn gridbdy2d(&self) -> MemoryDataset {
            let (lat, lon) = self.perimeter();
            let n = lat.len();
            let dims = ["TSTEP", "LAY", "PERIM"];
            self.ioapi_attributes(MemoryDataset::new("GRIDBDY2D"))
                .with_variable("LAT", Variable::new("LAT", &dims, &[1, 1, n], lat).expect("LAT"))
                .and_then(|d| d.with_variable("LON", Variable::new("LON", &dims, &[1, 1, n], lon).expect("LON")))
                .expect("GRIDBDY2D fixture")
        }

        /// Write all five MCIP files as `<TYPE>_<suffix>` into `dir`.
        pub fn write(&self, dir: &Path, suffix: &str) {
            write_dataset_file(dir, &format!("GRIDCRO2D_{}", suffix), &self.gridcro2d());
            write_dataset_file(dir, &format!("GRIDDOT2D_{}", suffix), &self.griddot2d());
            write_dataset_file(dir, &format!("METCRO3D_{}", suffix), &self.metcro3d());
            write_dataset_file(dir, &format!("METCRO2D_{}", suffix), &self.metcro2d());
            write_dataset_file(dir, &format!("GRIDBDY2D_{}", suffix), &self.gridbdy2d());
        }
    }
}
