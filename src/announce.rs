//! Announcement scheduler.
//!
//! Decides what to speak and when. Step announcements come in two tiers
//! (advance and immediate), each spoken at most once per step index.
//! Arrivals are spoken once per waypoint id and the reroute notice once
//! per off-route excursion.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::NavigationConfig;
use crate::maneuver::format_distance;
use crate::model::Waypoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    /// Interrupts a low-priority utterance in progress.
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
    pub text: String,
    pub priority: Priority,
}

impl Announcement {
    fn low(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::Low,
        }
    }

    fn high(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            priority: Priority::High,
        }
    }
}

/// Dedup state for spoken output. Owned by the navigator session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnouncementScheduler {
    pub last_advance_step: Option<usize>,
    pub last_immediate_step: Option<usize>,
    pub announced_waypoints: BTreeSet<String>,
    pub reroute_announced: bool,
}

impl AnnouncementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step announcement for the given distance to the maneuver, if one is due.
    pub fn for_step(
        &mut self,
        step_index: usize,
        distance_m: f64,
        instruction: &str,
        config: &NavigationConfig,
    ) -> Option<Announcement> {
        if distance_m < config.immediate_announce_m {
            if self.last_immediate_step == Some(step_index) {
                return None;
            }
            self.last_immediate_step = Some(step_index);
            // Past the advance window; never speak it late
            self.last_advance_step = Some(step_index);
            return Some(Announcement::high(instruction));
        }

        let in_advance_window = distance_m > config.advance_announce_min_m
            && distance_m < config.advance_announce_max_m;
        if in_advance_window && self.last_advance_step != Some(step_index) {
            self.last_advance_step = Some(step_index);
            return Some(Announcement::low(format!(
                "In {}, {}",
                format_distance(distance_m),
                lowercase_first(instruction)
            )));
        }

        None
    }

    pub fn for_arrival(&mut self, waypoint: &Waypoint) -> Option<Announcement> {
        if !self.announced_waypoints.insert(waypoint.id.clone()) {
            return None;
        }
        Some(Announcement::high(format!("Arriving at {}", waypoint.display_name())))
    }

    pub fn for_route_complete(&self) -> Announcement {
        Announcement::high("Route complete. You have reached your final stop.")
    }

    pub fn for_start(&self) -> Announcement {
        Announcement::low("Navigation started")
    }

    /// Reroute notice, once per excursion.
    pub fn for_reroute(&mut self) -> Option<Announcement> {
        if self.reroute_announced {
            return None;
        }
        self.reroute_announced = true;
        Some(Announcement::low("Recalculating route"))
    }

    /// The operator is back on the route; the next excursion may be announced.
    pub fn back_on_route(&mut self) {
        self.reroute_announced = false;
    }

    /// Forget step dedup so step 0 of a fresh path can be announced.
    pub fn reset_steps(&mut self) {
        self.last_advance_step = None;
        self.last_immediate_step = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
