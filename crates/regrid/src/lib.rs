//! Grid correspondence between curvilinear and regular lat/lon grids.
//!
//! - [`nearest`]: great-circle nearest-neighbour matching
//! - [`window`]: locating a CMAQ domain inside a host-model grid
//! - [`mapping`]: polygon-overlap area weights, cached per domain
//! - [`surfzone`]: open-ocean and surf-zone cell fractions from a [`coastline`]
//! - [`vertical`]: injection-height layer distribution
//! - [`levels`]: pressure-level matching between vertical coordinates

pub mod coastline;
pub mod error;
pub mod geometry;
pub mod latlon;
pub mod levels;
pub mod mapping;
pub mod nearest;
pub mod surfzone;
pub mod vertical;
pub mod window;

pub use coastline::Coastline;
pub use error::{RegridError, Result};
pub use latlon::RegularLatLonGrid;
pub use mapping::{area_weights, GridMapping, WeightBasis, WeightedIndex};
pub use nearest::{haversine_km, nearest_index, NearestMatch, EARTH_RADIUS_KM};
pub use surfzone::{surf_zone_fractions, SurfZoneFractions, SURF_BUFFER_DEG};
pub use vertical::{distribute, VerticalColumn};
pub use window::{find_subwindow, SubWindow, CORNER_MISMATCH_WARN_KM};
