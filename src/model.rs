//! Route and navigation data model.
//!
//! Every type here is serializable so it can cross the JNI boundary as
//! JSON or be handed to a non-Android frontend directly. Coordinates are
//! WGS84 degrees in (lon, lat) order, matching GeoJSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::RouteError;

/// A geographic coordinate. Serialized as `[lon, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lon, c.lat]
    }
}

/// A single fix from the position source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coordinates: Coordinate,
    pub timestamp: DateTime<Utc>,
    /// Ground speed in m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Heading in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// Horizontal accuracy in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Position {
    pub fn new(coordinates: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinates,
            timestamp,
            speed: None,
            heading: None,
            accuracy: None,
        }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed = Some(speed_mps);
        self
    }
}

/// A must-visit stop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub id: String,
    pub coordinates: Coordinate,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_arrival: Option<DateTime<Utc>>,
}

impl Waypoint {
    pub fn new(id: impl Into<String>, coordinates: Coordinate, order: u32) -> Self {
        Self {
            id: id.into(),
            coordinates,
            order,
            name: None,
            address: None,
            is_completed: false,
            estimated_arrival: None,
            actual_arrival: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name used in spoken output, falling back to the address and then
    /// to the stop number.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.address.clone())
            .unwrap_or_else(|| format!("stop {}", self.order + 1))
    }
}

/// The turn or action tied to a point on the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    #[serde(rename = "type")]
    pub maneuver_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    pub location: Coordinate,
}

/// One instruction of a computed path. Replaced wholesale on reroute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStep {
    pub instruction: String,
    /// Meters to the next step.
    pub distance: f64,
    /// Seconds to the next step.
    pub duration: f64,
    #[serde(default)]
    pub geometry: Vec<Coordinate>,
    pub maneuver: Maneuver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    #[default]
    Draft,
    Active,
    Completed,
}

/// A planned multi-stop route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: RouteStatus,
    pub waypoints: Vec<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Coordinate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_steps: Option<Vec<NavigationStep>>,
    /// Total path length in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Estimated travel time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds between start and completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<f64>,
}

impl Route {
    /// Build a draft route. Waypoints are sorted by `order`.
    pub fn new(id: impl Into<String>, mut waypoints: Vec<Waypoint>) -> Self {
        waypoints.sort_by_key(|w| w.order);
        Self {
            id: id.into(),
            name: None,
            status: RouteStatus::Draft,
            waypoints,
            geometry: None,
            navigation_steps: None,
            distance: None,
            estimated_duration: None,
            started_at: None,
            completed_at: None,
            actual_duration: None,
        }
    }

    /// Attach a computed path.
    pub fn with_path(mut self, path: PathResult) -> Self {
        self.apply_path(path);
        self
    }

    /// Replace geometry, steps, distance and duration with a fresh path.
    pub fn apply_path(&mut self, path: PathResult) {
        self.geometry = Some(path.geometry);
        self.navigation_steps = Some(path.steps);
        self.distance = Some(path.distance);
        self.estimated_duration = Some(path.duration);
    }

    pub fn geometry(&self) -> &[Coordinate] {
        self.geometry.as_deref().unwrap_or(&[])
    }

    pub fn steps(&self) -> &[NavigationStep] {
        self.navigation_steps.as_deref().unwrap_or(&[])
    }

    pub fn waypoint(&self, id: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    pub fn waypoint_mut(&mut self, id: &str) -> Option<&mut Waypoint> {
        self.waypoints.iter_mut().find(|w| w.id == id)
    }

    pub fn is_fully_completed(&self) -> bool {
        !self.waypoints.is_empty() && self.waypoints.iter().all(|w| w.is_completed)
    }

    /// Check that the route is non-empty, sorted, contiguous from 0 and
    /// has unique ids.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.waypoints.is_empty() {
            return Err(RouteError::Empty);
        }

        let mut ids = BTreeSet::new();
        for (expected, wp) in self.waypoints.iter().enumerate() {
            let expected = expected as u32;
            if wp.order < expected {
                return Err(RouteError::DuplicateOrder(wp.order));
            }
            if wp.order != expected {
                return Err(RouteError::NonContiguousOrder {
                    expected,
                    found: wp.order,
                });
            }
            if !ids.insert(wp.id.as_str()) {
                return Err(RouteError::DuplicateId(wp.id.clone()));
            }
        }

        Ok(())
    }
}

/// Output of the external path provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    pub geometry: Vec<Coordinate>,
    pub distance: f64,
    pub duration: f64,
    pub steps: Vec<NavigationStep>,
}

/// Derived navigation state, recomputed from scratch on every sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub is_navigating: bool,
    pub current_step_index: usize,
    pub current_instruction: Option<String>,
    pub distance_to_next_maneuver: f64,
    pub next_waypoint: Option<Waypoint>,
    pub distance_to_next_waypoint: Option<f64>,
    pub eta_to_next_waypoint: Option<DateTime<Utc>>,
    /// Completion percentage in [0, 100].
    pub route_progress: f64,
    pub is_off_route: bool,
    pub is_rerouting: bool,
    pub completed_waypoint_ids: Vec<String>,
}

/// Passed to the route-complete callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub route_id: String,
    pub total_duration_secs: f64,
}
