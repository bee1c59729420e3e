//! IOAPI horizontal grid definitions.

use cmaq_common::{CellGeometry, CurvilinearGrid};
use serde::{Deserialize, Serialize};

use crate::{LambertConformal, ProjectionError, ProjectionResult};

/// IOAPI grid type code for Lambert conformal conic grids.
pub const GDTYP_LAMBERT: i32 = 2;

/// Horizontal grid definition from IOAPI global attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct IoapiGridDef {
    pub gdtyp: i32,
    pub p_alp: f64,
    pub p_bet: f64,
    pub p_gam: f64,
    pub xcent: f64,
    pub ycent: f64,
    pub xorig: f64,
    pub yorig: f64,
    pub xcell: f64,
    pub ycell: f64,
    pub ncols: usize,
    pub nrows: usize,
}

impl IoapiGridDef {
    /// Build the map projection for this grid.
    pub fn projection(&self) -> ProjectionResult<LambertConformal> {
        if self.gdtyp != GDTYP_LAMBERT {
            return Err(ProjectionError::UnsupportedGridType(self.gdtyp));
        }
        LambertConformal::new(self.p_alp, self.p_bet, self.p_gam, self.ycent)
    }

    /// Cell size, validated.
    pub fn cell_geometry(&self) -> ProjectionResult<CellGeometry> {
        Ok(CellGeometry::new(self.xcell, self.ycell)?)
    }

    /// Cell-centre and cell-corner coordinates.
    ///
    /// The projection origin is `(XCENT, YCENT)`; `XORIG`/`YORIG` give the
    /// south-west corner of cell (0, 0) relative to it.
    pub fn to_grid(&self) -> ProjectionResult<CurvilinearGrid> {
        let proj = self.projection()?;
        // Non-zero only when XCENT differs from P_GAM
        let (x0, y0) = proj.project(self.ycent, self.xcent);

        let (rows, cols) = (self.nrows, self.ncols);
        let mut lat = Vec::with_capacity(rows * cols);
        let mut lon = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let x = x0 + self.xorig + (c as f64 + 0.5) * self.xcell;
                let y = y0 + self.yorig + (r as f64 + 0.5) * self.ycell;
                let (la, lo) = proj.unproject(x, y);
                lat.push(la);
                lon.push(lo);
            }
        }

        let mut corner_lat = Vec::with_capacity((rows + 1) * (cols + 1));
        let mut corner_lon = Vec::with_capacity((rows + 1) * (cols + 1));
        for r in 0..=rows {
            for c in 0..=cols {
                let x = x0 + self.xorig + c as f64 * self.xcell;
                let y = y0 + self.yorig + r as f64 * self.ycell;
                let (la, lo) = proj.unproject(x, y);
                corner_lat.push(la);
                corner_lon.push(lo);
            }
        }

        Ok(CurvilinearGrid::new(rows, cols, lat, lon)?.with_corners(corner_lat, corner_lon)?)
    }
}
