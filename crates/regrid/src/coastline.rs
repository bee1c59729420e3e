//! Land polygons from coastline shapefiles (e.g. GSHHS level 1).

use std::path::Path;

use cmaq_common::BoundingBox;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{PolygonRing, Reader, Shape};
use tracing::debug;

use crate::geometry::polygon_bbox;
use crate::{RegridError, Result};

/// Land masses in lon/lat degrees.
#[derive(Debug, Clone)]
pub struct Coastline {
    land: MultiPolygon<f64>,
}

impl Default for Coastline {
    fn default() -> Self {
        Self {
            land: MultiPolygon(Vec::new()),
        }
    }
}

impl Coastline {
    pub fn from_polygons(polygons: Vec<Polygon<f64>>) -> Self {
        Self {
            land: MultiPolygon(polygons),
        }
    }

    /// Load the polygons of a shapefile whose extent overlaps `bbox`.
    ///
    /// Inner rings become holes of the preceding outer ring. Non-polygon
    /// shapes are ignored.
    pub fn load(path: impl AsRef<Path>, bbox: &BoundingBox) -> Result<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let mut reader = Reader::from_path(path).map_err(|e| RegridError::shapefile(&shown, e))?;

        let mut polygons = Vec::new();
        let mut ignored = 0usize;
        for result in reader.iter_shapes_and_records() {
            let (shape, _record) = result.map_err(|e| RegridError::shapefile(&shown, e))?;
            let Shape::Polygon(polygon) = shape else {
                ignored += 1;
                continue;
            };

            let mut current: Option<Polygon<f64>> = None;
            for ring in polygon.rings() {
                let line: LineString<f64> = ring
                    .points()
                    .iter()
                    .map(|p| Coord { x: p.x, y: p.y })
                    .collect();
                match ring {
                    PolygonRing::Outer(_) => {
                        polygons.extend(current.take());
                        current = Some(Polygon::new(line, vec![]));
                    }
                    PolygonRing::Inner(_) => {
                        if let Some(outer) = current.as_mut() {
                            outer.interiors_push(line);
                        }
                    }
                }
            }
            polygons.extend(current);
        }

        let total = polygons.len();
        polygons.retain(|p| polygon_bbox(p).is_some_and(|b| b.intersects(bbox)));
        debug!(
            path = %shown,
            total,
            kept = polygons.len(),
            ignored,
            "Loaded coastline polygons"
        );
        Ok(Self::from_polygons(polygons))
    }

    pub fn land(&self) -> &MultiPolygon<f64> {
        &self.land
    }

    pub fn len(&self) -> usize {
        self.land.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.land.0.is_empty()
    }
}
