//! Turn classification and instruction text.
//!
//! Computes turn directions from bearing changes along a polyline and
//! derives navigation steps for paths that arrive without any (GPX
//! imports). Also owns the distance phrasing used in announcements.

use serde::Serialize;
use crate::geo::{bearing, polyline_length};
use crate::model::{Coordinate, Maneuver, NavigationStep};

/// Turn direction categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Depart,
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
    Arrive,
}

impl Turn {
    /// Maneuver type and modifier in the vocabulary path providers use.
    fn maneuver_kind(self) -> (&'static str, Option<&'static str>) {
        match self {
            Turn::Depart => ("depart", None),
            Turn::Straight => ("continue", Some("straight")),
            Turn::SlightLeft => ("turn", Some("slight left")),
            Turn::Left => ("turn", Some("left")),
            Turn::SharpLeft => ("turn", Some("sharp left")),
            Turn::SlightRight => ("turn", Some("slight right")),
            Turn::Right => ("turn", Some("right")),
            Turn::SharpRight => ("turn", Some("sharp right")),
            Turn::UTurn => ("turn", Some("uturn")),
            Turn::Arrive => ("arrive", None),
        }
    }
}

/// Derive navigation steps from a bare polyline.
///
/// Produces a depart step, one step per vertex where the heading
/// changes noticeably, and an arrive step. Each step's geometry runs
/// from its maneuver to the next one. `speed_mps` is used for step
/// durations. Returns an empty list for fewer than 2 points.
pub fn generate_steps(points: &[Coordinate], speed_mps: f64) -> Vec<NavigationStep> {
    if points.len() < 2 {
        return Vec::new();
    }

    // (vertex index, turn) for every maneuver along the line
    let mut maneuvers = vec![(0, Turn::Depart)];
    for i in 1..points.len() - 1 {
        let turn = compute_turn(&points[i - 1], &points[i], &points[i + 1]);
        if turn != Turn::Straight {
            maneuvers.push((i, turn));
        }
    }
    let last = points.len() - 1;
    maneuvers.push((last, Turn::Arrive));

    maneuvers
        .iter()
        .enumerate()
        .map(|(n, &(vertex, turn))| {
            let end = maneuvers.get(n + 1).map_or(vertex, |&(next, _)| next);
            let geometry = points[vertex..=end].to_vec();
            let distance = polyline_length(&geometry);
            let instruction = match turn {
                Turn::Depart => format!(
                    "Head {}",
                    compass_direction(bearing(&points[0], &points[1]))
                ),
                _ => capitalize(turn_to_text(turn)),
            };
            let (kind, modifier) = turn.maneuver_kind();

            NavigationStep {
                instruction,
                distance,
                duration: if speed_mps > 0.0 { distance / speed_mps } else { 0.0 },
                geometry,
                maneuver: Maneuver {
                    maneuver_type: kind.to_string(),
                    modifier: modifier.map(str::to_string),
                    location: points[vertex],
                },
            }
        })
        .collect()
}

/// Compute the turn direction at point B given the approach from A
/// and the exit toward C.
fn compute_turn(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> Turn {
    let bearing_ab = bearing(a, b);
    let bearing_bc = bearing(b, c);

    // Relative angle: positive = right turn, negative = left turn
    let mut angle = bearing_bc - bearing_ab;

    // Normalize to [-180, 180]
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }

    classify_turn(angle)
}

/// Classify a relative bearing angle into a turn direction.
fn classify_turn(angle: f64) -> Turn {
    let abs_angle = angle.abs();

    if abs_angle > 170.0 {
        Turn::UTurn
    } else if abs_angle > 120.0 {
        if angle > 0.0 { Turn::SharpRight } else { Turn::SharpLeft }
    } else if abs_angle > 60.0 {
        if angle > 0.0 { Turn::Right } else { Turn::Left }
    } else if abs_angle > 20.0 {
        if angle > 0.0 { Turn::SlightRight } else { Turn::SlightLeft }
    } else {
        Turn::Straight
    }
}

fn turn_to_text(turn: Turn) -> &'static str {
    match turn {
        Turn::Depart => "depart",
        Turn::Straight => "continue straight",
        Turn::SlightLeft => "keep slightly left",
        Turn::Left => "turn left",
        Turn::SharpLeft => "turn sharp left",
        Turn::SlightRight => "keep slightly right",
        Turn::Right => "turn right",
        Turn::SharpRight => "turn sharp right",
        Turn::UTurn => "make a U-turn",
        Turn::Arrive => "arrive at destination",
    }
}

fn compass_direction(bearing_deg: f64) -> &'static str {
    const NAMES: [&str; 8] = [
        "north", "northeast", "east", "southeast",
        "south", "southwest", "west", "northwest",
    ];
    let sector = ((bearing_deg + 22.5).rem_euclid(360.0) / 45.0) as usize;
    NAMES[sector % 8]
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Distance phrasing for spoken output: 10 m steps below 1 km, one
/// decimal above.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters / 10.0).round() as i64 * 10)
    }
}
