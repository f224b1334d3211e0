//! Navigation tuning parameters.

use serde::{Deserialize, Serialize};

use crate::error::NavError;

/// Thresholds and timings used by the navigator.
///
/// Every field has a default, so a partial JSON object is enough to
/// override a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Distance from the route polyline beyond which the operator is off route (meters).
    pub off_route_threshold_m: f64,
    /// Radius for automatic waypoint arrival (meters).
    pub arrival_radius_m: f64,
    /// Radius within which a waypoint may be completed by hand (meters).
    pub manual_completion_radius_m: f64,
    /// Lower bound of the advance announcement window (meters, exclusive).
    pub advance_announce_min_m: f64,
    /// Upper bound of the advance announcement window (meters, exclusive).
    pub advance_announce_max_m: f64,
    /// Distance under which the immediate announcement fires (meters).
    pub immediate_announce_m: f64,
    /// How long the operator must stay off route before rerouting (milliseconds).
    pub reroute_debounce_ms: u64,
    /// Speed assumed for ETA when the fix carries none (km/h).
    pub fallback_speed_kmh: f64,
    /// How far past a maneuver the operator may be before it counts as passed (meters).
    pub maneuver_pass_tolerance_m: f64,
    pub voice_enabled: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            off_route_threshold_m: 100.0,
            arrival_radius_m: 50.0,
            manual_completion_radius_m: 100.0,
            advance_announce_min_m: 150.0,
            advance_announce_max_m: 200.0,
            immediate_announce_m: 50.0,
            reroute_debounce_ms: 2000,
            fallback_speed_kmh: 40.0,
            maneuver_pass_tolerance_m: 15.0,
            voice_enabled: true,
        }
    }
}

impl NavigationConfig {
    /// Parse a config from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NavError> {
        let distances = [
            ("off_route_threshold_m", self.off_route_threshold_m),
            ("arrival_radius_m", self.arrival_radius_m),
            ("manual_completion_radius_m", self.manual_completion_radius_m),
            ("immediate_announce_m", self.immediate_announce_m),
            ("fallback_speed_kmh", self.fallback_speed_kmh),
        ];
        for (name, value) in distances {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::Config(format!("{name} must be positive, got {value}")));
            }
        }

        if self.maneuver_pass_tolerance_m < 0.0 {
            return Err(NavError::Config("maneuver_pass_tolerance_m must not be negative".into()));
        }

        if self.advance_announce_min_m >= self.advance_announce_max_m {
            return Err(NavError::Config(format!(
                "advance window is empty: {} >= {}",
                self.advance_announce_min_m, self.advance_announce_max_m
            )));
        }

        Ok(())
    }

    pub fn reroute_debounce(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.reroute_debounce_ms as i64)
    }
}
