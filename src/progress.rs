//! Off-route detection, route progress and ETA.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt::Display;

use crate::geo::closest_point_on_polyline;
use crate::model::{Coordinate, Waypoint};
use crate::waypoints::find_next_waypoint;

/// True when `position` is farther than `threshold_m` from the route
/// polyline. A route without geometry is never off route.
pub fn is_off_route(position: &Coordinate, geometry: &[Coordinate], threshold_m: f64) -> bool {
    closest_point_on_polyline(position, geometry)
        .map(|cp| cp.distance > threshold_m)
        .unwrap_or(false)
}

/// Route completion percentage in [0, 100].
///
/// Each waypoint is worth an equal share. Completed waypoints count in
/// full; the leg towards the next waypoint counts by how much of it the
/// operator has covered along the geometry.
pub fn route_progress(
    position: &Coordinate,
    geometry: &[Coordinate],
    waypoints: &[Waypoint],
) -> f64 {
    if waypoints.is_empty() {
        return 0.0;
    }

    let total = waypoints.len() as f64;
    let done = waypoints.iter().filter(|w| w.is_completed).count() as f64;
    let share = 100.0 / total;
    let base = done * share;

    let Some(next) = find_next_waypoint(waypoints) else {
        return 100.0;
    };

    let leg_fraction = leg_fraction(position, geometry, waypoints, next).unwrap_or(0.0);

    (base + leg_fraction * share).clamp(0.0, 100.0)
}

/// Share of the leg towards `next` already covered, measured along the
/// geometry from the last completed waypoint before it (or the start).
fn leg_fraction(
    position: &Coordinate,
    geometry: &[Coordinate],
    waypoints: &[Waypoint],
    next: &Waypoint,
) -> Option<f64> {
    let along = |c: &Coordinate| closest_point_on_polyline(c, geometry).map(|cp| cp.distance_along);

    let at = along(position)?;
    let end = along(&next.coordinates)?;
    let start = waypoints
        .iter()
        .filter(|w| w.is_completed && w.order < next.order)
        .max_by_key(|w| w.order)
        .and_then(|w| along(&w.coordinates))
        .unwrap_or(0.0);

    let span = end - start;
    if span <= 1.0 {
        return None;
    }
    Some(((at - start) / span).clamp(0.0, 1.0))
}

/// Speeds below this are treated as stationary GPS noise.
const MIN_SPEED_MPS: f64 = 0.1;

/// Upper bound on the travel time added to `from` (30 days).
const MAX_ETA_MS: f64 = 30.0 * 24.0 * 3600.0 * 1000.0;

/// Estimated arrival time for `distance_m` starting at `from`.
///
/// Falls back to `fallback_kmh` when the speed is missing, below
/// 0.1 m/s or not a usable number. The travel time is capped at 30 days.
pub fn calculate_eta(
    distance_m: f64,
    speed_mps: Option<f64>,
    fallback_kmh: f64,
    from: DateTime<Utc>,
) -> DateTime<Utc> {
    let speed = match speed_mps {
        Some(s) if s.is_finite() && s >= MIN_SPEED_MPS => s,
        _ => fallback_kmh / 3.6,
    };
    let millis = distance_m.max(0.0) / speed * 1000.0;
    let millis = if millis.is_finite() { millis.min(MAX_ETA_MS) } else { MAX_ETA_MS };
    from.checked_add_signed(Duration::milliseconds(millis.round() as i64))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn calculate_eta_from_now(
    distance_m: f64,
    speed_mps: Option<f64>,
    fallback_kmh: f64,
) -> DateTime<Utc> {
    calculate_eta(distance_m, speed_mps, fallback_kmh, Utc::now())
}

/// Render an ETA on a 12-hour clock, e.g. "2:05 PM".
pub fn format_eta<Tz>(eta: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    eta.format("%-I:%M %p").to_string()
}
