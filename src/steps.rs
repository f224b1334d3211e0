//! Step locator.
//!
//! Picks the active navigation step for a position. The active step is
//! the first one whose maneuver is still ahead of the operator, so the
//! guidance never snaps back to a maneuver that was already passed even
//! when that maneuver point happens to be the nearest one.

use log::debug;
use serde::Serialize;
use crate::geo::{closest_point_on_polyline, distance, polyline_length};
use crate::model::{Coordinate, NavigationStep};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepLocation {
    pub step_index: usize,
    /// Meters from the position to the active step's maneuver point.
    pub distance_to_maneuver: f64,
}

/// Locate the active step for `position`.
///
/// When the steps carry geometry, the position is projected onto the
/// chained step geometries and the first maneuver not more than
/// `pass_tolerance_m` behind that projection is chosen. Without
/// geometry the nearest maneuver is used, advanced by one once the
/// operator is closer to the following maneuver than the nearest one is.
pub fn find_current_step(
    position: &Coordinate,
    steps: &[NavigationStep],
    pass_tolerance_m: f64,
) -> StepLocation {
    if steps.is_empty() {
        return StepLocation {
            step_index: 0,
            distance_to_maneuver: 0.0,
        };
    }

    let step_index = along_route_step(position, steps, pass_tolerance_m)
        .unwrap_or_else(|| nearest_ahead_step(position, steps));

    StepLocation {
        step_index,
        distance_to_maneuver: distance(position, &steps[step_index].maneuver.location),
    }
}

fn along_route_step(
    position: &Coordinate,
    steps: &[NavigationStep],
    pass_tolerance_m: f64,
) -> Option<usize> {
    // Along-route offset of every maneuver: the summed length of the
    // step geometries before it
    let mut offsets = Vec::with_capacity(steps.len());
    let mut total = 0.0;
    for step in steps {
        offsets.push(total);
        total += polyline_length(&step.geometry);
    }

    let mut best: Option<(f64, f64)> = None;
    for (i, step) in steps.iter().enumerate() {
        if let Some(cp) = closest_point_on_polyline(position, &step.geometry) {
            if best.map_or(true, |(d, _)| cp.distance < d) {
                best = Some((cp.distance, offsets[i] + cp.distance_along));
            }
        }
    }
    let (_, operator_along) = best?;

    let index = offsets
        .iter()
        .position(|&offset| offset + pass_tolerance_m >= operator_along)
        .unwrap_or(steps.len() - 1);

    let nearest = nearest_maneuver(position, steps);
    if nearest < index {
        debug!("nearest maneuver {nearest} is behind the operator, keeping step {index}");
    }

    Some(index)
}

fn nearest_ahead_step(position: &Coordinate, steps: &[NavigationStep]) -> usize {
    let k = nearest_maneuver(position, steps);
    match steps.get(k + 1) {
        Some(next) => {
            let to_next = distance(position, &next.maneuver.location);
            let leg = distance(&steps[k].maneuver.location, &next.maneuver.location);
            if to_next < leg { k + 1 } else { k }
        }
        None => k,
    }
}

fn nearest_maneuver(position: &Coordinate, steps: &[NavigationStep]) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, step) in steps.iter().enumerate() {
        let d = distance(position, &step.maneuver.location);
        if d < best.1 {
            best = (i, d);
        }
    }
    best.0
}
