//! Polygon overlap in lon/lat degrees, on top of the `geo` crate.
//!
//! Grid cells are small enough that treating degrees as a locally flat
//! coordinate system is adequate for overlap fractions.

use cmaq_common::BoundingBox;
use geo::{Area, BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};

/// Closed polygon from `(lon, lat)` vertices.
pub fn to_polygon(vertices: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(vertices.to_vec()), vec![])
}

/// Rectangle covering `bbox`.
pub fn to_rect(bbox: &BoundingBox) -> Rect<f64> {
    Rect::new(
        Coord { x: bbox.min_x, y: bbox.min_y },
        Coord { x: bbox.max_x, y: bbox.max_y },
    )
}

/// Unsigned polygon area in square degrees.
pub fn polygon_area(vertices: &[(f64, f64)]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    to_polygon(vertices).unsigned_area()
}

/// Bounding box of a polygon.
pub fn polygon_bbox(polygon: &Polygon<f64>) -> Option<BoundingBox> {
    polygon
        .bounding_rect()
        .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
}

/// Area of the overlap between a polygon and a rectangle.
pub fn intersection_area(polygon: &Polygon<f64>, rect: &Rect<f64>) -> f64 {
    polygon.intersection(&rect.to_polygon()).unsigned_area()
}

/// Area of the overlap between a polygon and a set of polygons.
pub fn overlap_area(polygon: &Polygon<f64>, region: &MultiPolygon<f64>) -> f64 {
    if region.0.is_empty() {
        return 0.0;
    }
    polygon.intersection(region).unsigned_area()
}
