//! Lambert Conformal Conic projection.
//!
//! Spherical form, as used by MCIP/IOAPI for `GDTYP = 2` grids. Projection
//! coordinates are metres east/north of the projection origin
//! (`XCENT`, `YCENT`).
//!
//! The projection parameters include:
//! - Standard parallels: `P_ALP` and `P_BET` (equal for a tangent cone)
//! - Central meridian: `P_GAM`
//! - Origin latitude: `YCENT`

use std::f64::consts::PI;

use crate::{ProjectionError, ProjectionResult};

/// Sphere radius used by WRF and MCIP (metres).
pub const EARTH_RADIUS_M: f64 = 6_370_000.0;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian in radians
    pub lon0: f64,
    /// Origin latitude in radians
    pub lat0: f64,
    /// Earth radius (meters)
    pub earth_radius: f64,
    /// Cone constant (n)
    n: f64,
    /// F constant
    f: f64,
    /// Rho at the origin latitude
    rho0: f64,
}

impl LambertConformal {
    /// Create a projection from standard parallels, central meridian and
    /// origin latitude (all in degrees).
    pub fn new(
        latin1_deg: f64,
        latin2_deg: f64,
        lon0_deg: f64,
        lat0_deg: f64,
    ) -> ProjectionResult<Self> {
        Self::with_radius(latin1_deg, latin2_deg, lon0_deg, lat0_deg, EARTH_RADIUS_M)
    }

    /// Same as [`LambertConformal::new`] with an explicit sphere radius.
    pub fn with_radius(
        latin1_deg: f64,
        latin2_deg: f64,
        lon0_deg: f64,
        lat0_deg: f64,
        earth_radius: f64,
    ) -> ProjectionResult<Self> {
        let to_rad = PI / 180.0;

        let latin1 = latin1_deg * to_rad;
        let latin2 = latin2_deg * to_rad;
        let lon0 = lon0_deg * to_rad;
        let lat0 = lat0_deg * to_rad;

        if latin1.abs() < 1e-10 && latin2.abs() < 1e-10 {
            return Err(ProjectionError::InvalidParameters(
                "standard parallels at the equator describe a Mercator grid".to_string(),
            ));
        }

        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone
            latin1.sin()
        } else {
            // Secant cone
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = earth_radius * f / (PI / 4.0 + lat0 / 2.0).tan().powf(n);

        if !(n.is_finite() && f.is_finite() && rho0.is_finite()) {
            return Err(ProjectionError::InvalidParameters(format!(
                "degenerate cone for parallels {latin1_deg}/{latin2_deg}"
            )));
        }

        Ok(Self {
            lon0,
            lat0,
            earth_radius,
            n,
            f,
            rho0,
        })
    }

    /// Cone constant.
    pub fn cone_constant(&self) -> f64 {
        self.n
    }

    /// Geographic (degrees) to projection coordinates (metres from origin).
    pub fn project(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let to_rad = PI / 180.0;
        let lat = lat_deg * to_rad;
        let lon = lon_deg * to_rad;

        let mut dlon = lon - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = self.earth_radius * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;

        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    /// Projection coordinates (metres from origin) to `(lat, lon)` in degrees.
    pub fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;
        let dy = self.rho0 - y;

        let mut rho = (x * x + dy * dy).sqrt();
        let theta = if self.n < 0.0 {
            rho = -rho;
            (-x).atan2(-dy)
        } else {
            x.atan2(dy)
        };

        let lat = if rho == 0.0 {
            self.n.signum() * PI / 2.0
        } else {
            2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0
        };
        let lon = self.lon0 + theta / self.n;

        (lat * to_deg, normalize_lon(lon * to_deg))
    }
}

/// Wrap a longitude to [-180, 180).
fn normalize_lon(lon: f64) -> f64 {
    let mut l = lon;
    while l >= 180.0 {
        l -= 360.0;
    }
    while l < -180.0 {
        l += 360.0;
    }
    l
}
