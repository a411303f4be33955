//! Reduction of `GeoJSON` geometries to heat map points.
//!
//! Points pass through, polygons collapse to the centroid of their exterior
//! ring, and collections are reduced recursively. Anything malformed
//! contributes no points rather than failing the pass.

use geo::{Coord, Point};
use serde_json::Value;

use crate::coords::{normalize_members, normalize_position};

/// Rings with a twice-area below this are treated as degenerate.
const DEGENERATE_AREA: f64 = 1e-12;

/// A `GeoJSON` geometry borrowed from a decoded feature.
///
/// Each variant holds the geometry's top-level `coordinates` (or
/// `geometries`) array. Polygon rings after the first are never read.
#[derive(Debug, Clone, Copy)]
pub enum GeometryNode<'a> {
    /// `[x, y, ...]`
    Point(&'a [Value]),
    /// `[[x, y], ...]`
    MultiPoint(&'a [Value]),
    /// `[exterior, hole, ...]`
    Polygon(&'a [Value]),
    /// `[polygon, ...]`
    MultiPolygon(&'a [Value]),
    /// Child geometry objects.
    GeometryCollection(&'a [Value]),
}

impl<'a> GeometryNode<'a> {
    /// Classifies a geometry object by its `type` member.
    ///
    /// Returns `None` for `null`, non-objects, unsupported types (e.g.
    /// `LineString`) and geometries whose payload is not an array.
    #[must_use]
    pub fn from_value(value: &'a Value) -> Option<Self> {
        let object = value.as_object()?;
        let kind = object.get("type")?.as_str()?;

        if kind == "GeometryCollection" {
            let children = object.get("geometries")?.as_array()?;
            return Some(Self::GeometryCollection(children));
        }

        let coords = object.get("coordinates")?.as_array()?;
        match kind {
            "Point" => Some(Self::Point(coords)),
            "MultiPoint" => Some(Self::MultiPoint(coords)),
            "Polygon" => Some(Self::Polygon(coords)),
            "MultiPolygon" => Some(Self::MultiPolygon(coords)),
            _ => None,
        }
    }
}

/// Reduces a geometry to points with `x = lon`, `y = lat`.
#[must_use]
pub fn reduce_geometry(geometry: &Value) -> Vec<Point<f64>> {
    let mut out = Vec::new();
    reduce_into(geometry, &mut out);
    out
}

fn reduce_into(geometry: &Value, out: &mut Vec<Point<f64>>) {
    let Some(node) = GeometryNode::from_value(geometry) else {
        if !geometry.is_null() {
            log::trace!("Skipping unsupported geometry");
        }
        return;
    };

    match node {
        GeometryNode::Point(coords) => {
            if let Some(c) = normalize_members(coords) {
                out.push(c.into());
            }
        }
        GeometryNode::MultiPoint(positions) => {
            out.extend(
                positions
                    .iter()
                    .filter_map(normalize_position)
                    .map(Point::from),
            );
        }
        GeometryNode::Polygon(rings) => {
            if let Some(c) = polygon_centroid(rings) {
                out.push(c.into());
            }
        }
        GeometryNode::MultiPolygon(polygons) => {
            out.extend(
                polygons
                    .iter()
                    .filter_map(Value::as_array)
                    .filter_map(|rings| polygon_centroid(rings))
                    .map(Point::from),
            );
        }
        GeometryNode::GeometryCollection(children) => {
            for child in children {
                reduce_into(child, out);
            }
        }
    }
}

/// Centroid of a polygon's exterior ring, or `None` if the ring is missing
/// or has no valid vertices.
fn polygon_centroid(rings: &[Value]) -> Option<Coord<f64>> {
    let exterior = rings.first()?.as_array()?;
    let vertices: Vec<Coord<f64>> = exterior.iter().filter_map(normalize_position).collect();
    ring_centroid(&vertices)
}

/// Planar centroid of a ring using the shoelace formula.
///
/// The ring is closed if its last vertex differs from the first. Rings with
/// fewer than three vertices, whose signed area is effectively zero, or
/// whose centroid falls outside the WGS84 ranges fall back to the mean of
/// their vertices.
#[must_use]
pub fn ring_centroid(vertices: &[Coord<f64>]) -> Option<Coord<f64>> {
    if vertices.len() < 3 {
        return mean(vertices);
    }

    let mut ring = vertices.to_vec();
    if ring.first() != ring.last() {
        ring.push(ring[0]);
    }

    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for edge in ring.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        let cross = a.x.mul_add(b.y, -(b.x * a.y));
        twice_area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }

    if twice_area.abs() < DEGENERATE_AREA {
        // The closing vertex repeats the first one.
        return mean(&ring[..ring.len() - 1]);
    }

    let factor = 1.0 / (3.0 * twice_area);
    let centroid = Coord {
        x: cx * factor,
        y: cy * factor,
    };

    // Self-intersecting rings can push the centroid far off the map.
    if !in_range(centroid) {
        return mean(&ring[..ring.len() - 1]);
    }
    Some(centroid)
}

fn in_range(c: Coord<f64>) -> bool {
    (-180.0..=180.0).contains(&c.x) && (-90.0..=90.0).contains(&c.y)
}

#[allow(clippy::cast_precision_loss)]
fn mean(vertices: &[Coord<f64>]) -> Option<Coord<f64>> {
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let (sx, sy) = vertices
        .iter()
        .fold((0.0, 0.0), |(sx, sy), c| (sx + c.x, sy + c.y));
    Some(Coord {
        x: sx / n,
        y: sy / n,
    })
}
