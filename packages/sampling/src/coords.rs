//! Coordinate coercion for raw `GeoJSON` positions.
//!
//! Source files are not always clean: positions may be numeric strings or
//! written in `[lat, lon]` order. Positions are accepted in `[lon, lat]`
//! order when that fits the WGS84 ranges, swapped when only the reverse
//! order fits, and rejected otherwise.

use geo::Coord;
use serde_json::Value;

/// Parses a JSON number or numeric string into an `f64`.
///
/// The result may be non-finite (`"inf"`, `"NaN"`); callers decide whether
/// that is acceptable.
#[must_use]
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Like [`parse_number`], but only returns finite values.
#[must_use]
pub fn parse_finite(value: &Value) -> Option<f64> {
    parse_number(value).filter(|v| v.is_finite())
}

/// Normalizes an `(x, y)` pair into a coordinate with `x = lon`, `y = lat`.
///
/// Returns `None` if either value is not finite or the pair fits neither
/// `(lon, lat)` nor `(lat, lon)` order.
#[must_use]
pub fn normalize_lon_lat(x: f64, y: f64) -> Option<Coord<f64>> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }

    let (lon, lat) = if x.abs() <= 180.0 && y.abs() <= 90.0 {
        (x, y)
    } else if x.abs() <= 90.0 && y.abs() <= 180.0 {
        (y, x)
    } else {
        return None;
    };

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    Some(Coord { x: lon, y: lat })
}

/// Normalizes a raw `GeoJSON` position (`[x, y, ...]`).
#[must_use]
pub fn normalize_position(position: &Value) -> Option<Coord<f64>> {
    normalize_members(position.as_array()?)
}

/// Normalizes the members of a position array.
///
/// Positions with fewer than two elements or non-numeric members are
/// rejected. Extra members (elevation) are ignored.
#[must_use]
pub fn normalize_members(members: &[Value]) -> Option<Coord<f64>> {
    if members.len() < 2 {
        return None;
    }
    let x = parse_number(&members[0])?;
    let y = parse_number(&members[1])?;
    normalize_lon_lat(x, y)
}
