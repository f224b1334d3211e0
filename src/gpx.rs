//! GPX 1.1 route import.
//!
//! Wraps the `gpx` crate and turns a GPX document into a navigable
//! [`Route`]: route points (or, without any, the file's waypoints)
//! become stops, the first track becomes the path geometry, and
//! navigation steps are derived from that geometry.

use std::io::Read;

use crate::config::NavigationConfig;
use crate::error::{NavError, RouteError};
use crate::geo::polyline_length;
use crate::maneuver::generate_steps;
use crate::model::{Coordinate, PathResult, Route, Waypoint};

fn coordinate(wp: &gpx::Waypoint) -> Coordinate {
    let p = wp.point();
    Coordinate { lon: p.x(), lat: p.y() }
}

/// Parse a GPX document from any reader into a draft route.
///
/// Stops get ids `{route_id}-{n}` in file order. Without a track the
/// stops are joined by straight legs.
pub fn parse_route<R: Read>(
    reader: R,
    route_id: &str,
    config: &NavigationConfig,
) -> Result<Route, NavError> {
    let doc = gpx::read(reader).map_err(|e| NavError::Gpx(e.to_string()))?;

    let first_route = doc.routes.first();
    let stop_points = match first_route {
        Some(r) if !r.points.is_empty() => &r.points,
        _ => &doc.waypoints,
    };
    if stop_points.is_empty() {
        return Err(RouteError::Empty.into());
    }

    let waypoints: Vec<Waypoint> = stop_points
        .iter()
        .enumerate()
        .map(|(i, wp)| {
            let mut stop = Waypoint::new(format!("{route_id}-{i}"), coordinate(wp), i as u32);
            stop.name = wp.name.clone();
            stop.address = wp.description.clone();
            stop
        })
        .collect();

    let track = doc.tracks.first();
    let mut geometry: Vec<Coordinate> = track
        .map(|t| {
            t.segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(coordinate)
                .collect()
        })
        .unwrap_or_default();
    if geometry.len() < 2 {
        geometry = waypoints.iter().map(|w| w.coordinates).collect();
    }

    let mut route = Route::new(route_id, waypoints);
    route.name = first_route
        .and_then(|r| r.name.clone())
        .or_else(|| track.and_then(|t| t.name.clone()));

    if geometry.len() >= 2 {
        let speed_mps = config.fallback_speed_kmh / 3.6;
        let distance = polyline_length(&geometry);
        let steps = generate_steps(&geometry, speed_mps);
        route.apply_path(PathResult {
            distance,
            duration: distance / speed_mps,
            steps,
            geometry,
        });
    }

    Ok(route)
}

/// Parse a route from a byte slice. Convenience wrapper for JNI.
pub fn parse_route_bytes(
    data: &[u8],
    route_id: &str,
    config: &NavigationConfig,
) -> Result<Route, NavError> {
    parse_route(data, route_id, config)
}

/// Parse a route and return it as a JSON string.
pub fn parse_route_to_json(
    data: &[u8],
    route_id: &str,
    config: &NavigationConfig,
) -> Result<String, NavError> {
    let route = parse_route_bytes(data, route_id, config)?;
    Ok(serde_json::to_string(&route)?)
}
