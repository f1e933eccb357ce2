//! Geometric helpers: great-circle distance, Google encoded polylines and
//! cheap route sampling.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const POLYLINE_SCALE: f64 = 1e5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION_BIT: i64 = 0x20;
const ASCII_OFFSET: i64 = 63;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        distance_km(*self, *other)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        GeoPoint { lat, lon }
    }
}

/// Haversine distance in kilometres.
pub fn distance_km(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let dlat = (p2.lat - p1.lat).to_radians();
    let dlon = (p2.lon - p1.lon).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + p1.lat.to_radians().cos() * p2.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Decodes a Google encoded polyline into `(lat, lon)` points.
///
/// A trailing point whose chunks run past the end of the input is dropped.
pub fn decode_polyline(encoded: &str) -> Vec<GeoPoint> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        let Some(dlat) = next_delta(bytes, &mut index) else {
            break;
        };
        let Some(dlon) = next_delta(bytes, &mut index) else {
            break;
        };
        // Deltas that push the running sum out of range mean the input is garbage
        let (Some(next_lat), Some(next_lon)) = (lat.checked_add(dlat), lon.checked_add(dlon)) else {
            break;
        };
        lat = next_lat;
        lon = next_lon;

        points.push(GeoPoint::new(lat as f64 / POLYLINE_SCALE, lon as f64 / POLYLINE_SCALE));
    }

    points
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(*index)? as i64 - ASCII_OFFSET;
        *index += 1;
        // Malformed input longer than any real coordinate; stop instead of overflowing.
        if shift > 60 {
            return None;
        }
        result |= (byte & CHUNK_MASK) << shift;
        shift += 5;
        if byte < CONTINUATION_BIT {
            break;
        }
    }

    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Encodes points with the Google polyline algorithm (precision 1e-5).
pub fn encode_polyline(points: &[GeoPoint]) -> String {
    let mut encoded = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lon: i64 = 0;

    for point in points {
        let lat = (point.lat * POLYLINE_SCALE).round() as i64;
        let lon = (point.lon * POLYLINE_SCALE).round() as i64;
        push_delta(&mut encoded, lat - prev_lat);
        push_delta(&mut encoded, lon - prev_lon);
        prev_lat = lat;
        prev_lon = lon;
    }

    encoded
}

fn push_delta(out: &mut String, delta: i64) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION_BIT {
        out.push((((value & CHUNK_MASK) | CONTINUATION_BIT) + ASCII_OFFSET) as u8 as char);
        value >>= 5;
    }
    out.push((value + ASCII_OFFSET) as u8 as char);
}

/// Every `stride`-th point, starting with the first one.
pub fn sample_every(points: &[GeoPoint], stride: usize) -> impl Iterator<Item = &GeoPoint> {
    points.iter().step_by(stride.max(1))
}

/// Arithmetic mean of the vertices, `None` for an empty ring.
pub fn polygon_centroid(ring: &[GeoPoint]) -> Option<GeoPoint> {
    if ring.is_empty() {
        return None;
    }
    let n = ring.len() as f64;
    let lat = ring.iter().map(|p| p.lat).sum::<f64>() / n;
    let lon = ring.iter().map(|p| p.lon).sum::<f64>() / n;
    Some(GeoPoint::new(lat, lon))
}
