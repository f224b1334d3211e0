//! Geospatial primitives.
//!
//! Great-circle distance, bearing and nearest-point projection onto a
//! polyline. All coordinates use WGS84 (lon/lat in degrees). Pure
//! functions, no state.

use serde::Serialize;
use crate::model::Coordinate;

/// Earth radius in meters (WGS84 mean).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Result of projecting a position onto a polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClosestPoint {
    /// Nearest point on the polyline.
    pub point: Coordinate,
    /// Distance from the position to the nearest point, in meters.
    pub distance: f64,
    /// Index of the segment start vertex (0-based).
    pub segment_index: usize,
    /// Distance along the polyline from its first vertex to `point`, in meters.
    pub distance_along: f64,
}

/// Haversine distance between two points in meters.
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Initial bearing from `a` to `b` in degrees [0, 360).
pub fn bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = y.atan2(x).to_degrees();
    (bearing + 360.0) % 360.0
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|w| distance(&w[0], &w[1]))
        .sum()
}

/// Find the point on `polyline` nearest to `point`.
///
/// Each segment is projected onto separately, clamped to the segment.
/// The first segment with the minimum distance wins. A single-vertex
/// polyline yields that vertex. Returns None for an empty polyline.
pub fn closest_point_on_polyline(
    point: &Coordinate,
    polyline: &[Coordinate],
) -> Option<ClosestPoint> {
    match polyline {
        [] => None,
        [only] => Some(ClosestPoint {
            point: *only,
            distance: distance(point, only),
            segment_index: 0,
            distance_along: 0.0,
        }),
        _ => {
            let mut best: Option<ClosestPoint> = None;
            let mut cumulative_distance = 0.0;

            for (i, segment) in polyline.windows(2).enumerate() {
                let a = &segment[0];
                let b = &segment[1];

                let projected = project_on_segment(point, a, b);
                let dist = distance(point, &projected);

                let is_better = match &best {
                    Some(prev) => dist < prev.distance,
                    None => true,
                };

                if is_better {
                    best = Some(ClosestPoint {
                        point: projected,
                        distance: dist,
                        segment_index: i,
                        distance_along: cumulative_distance + distance(a, &projected),
                    });
                }

                cumulative_distance += distance(a, b);
            }

            best
        }
    }
}

/// Project a point onto a line segment defined by two endpoints.
///
/// Uses a planar approximation scaled by latitude cosine, which is
/// accurate enough for short segments (< 10 km).
fn project_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> Coordinate {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let dx = (b.lon - a.lon) * cos_lat;
    let dy = b.lat - a.lat;
    let px = (p.lon - a.lon) * cos_lat;
    let py = p.lat - a.lat;

    let seg_len_sq = dx * dx + dy * dy;

    if seg_len_sq < 1e-20 {
        // Degenerate segment, return endpoint
        return *a;
    }

    // Clamp parameter t to [0, 1] to stay on the segment
    let t = ((px * dx + py * dy) / seg_len_sq).clamp(0.0, 1.0);

    Coordinate {
        lon: a.lon + t * (b.lon - a.lon),
        lat: a.lat + t * (b.lat - a.lat),
    }
}
