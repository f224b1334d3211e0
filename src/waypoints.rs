//! Waypoint monitor.
//!
//! Tracks which stops are done and detects arrival. Detection only
//! enqueues a waypoint as pending; the navigator completes it in its
//! deferred side-effect pass, so one sample can never complete the same
//! stop twice.

use std::collections::BTreeSet;

use crate::geo::distance;
use crate::model::{Coordinate, Route, Waypoint};

/// First waypoint by `order` that is not completed yet.
pub fn find_next_waypoint(waypoints: &[Waypoint]) -> Option<&Waypoint> {
    waypoints
        .iter()
        .filter(|w| !w.is_completed)
        .min_by_key(|w| w.order)
}

/// True when `position` is strictly within `threshold_m` of the waypoint.
pub fn is_near_waypoint(position: &Coordinate, waypoint: &Waypoint, threshold_m: f64) -> bool {
    distance(position, &waypoint.coordinates) < threshold_m
}

#[derive(Debug, Clone, Default)]
pub struct WaypointMonitor {
    completed: BTreeSet<String>,
    pending: BTreeSet<String>,
}

impl WaypointMonitor {
    /// Seed the completed set from waypoints already flagged on the route.
    pub fn from_route(route: &Route) -> Self {
        Self {
            completed: route
                .waypoints
                .iter()
                .filter(|w| w.is_completed)
                .map(|w| w.id.clone())
                .collect(),
            pending: BTreeSet::new(),
        }
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.contains(id)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// Enqueue the next waypoint when `position` is inside `radius_m` of it.
    ///
    /// Returns the id that became pending, or None when there is nothing
    /// to do: no next stop, too far, or already completed or pending.
    pub fn detect_arrival(
        &mut self,
        position: &Coordinate,
        route: &Route,
        radius_m: f64,
    ) -> Option<String> {
        let next = find_next_waypoint(&route.waypoints)?;
        if self.completed.contains(&next.id) || self.pending.contains(&next.id) {
            return None;
        }
        if !is_near_waypoint(position, next, radius_m) {
            return None;
        }
        self.pending.insert(next.id.clone());
        Some(next.id.clone())
    }

    /// Record a completion. Returns false if the id was already completed.
    pub fn mark_completed(&mut self, id: &str) -> bool {
        self.pending.remove(id);
        self.completed.insert(id.to_string())
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }
}
