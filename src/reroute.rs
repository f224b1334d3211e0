//! Reroute controller.
//!
//! Debounces off-route samples and makes sure at most one path
//! computation is in flight.
//!
//! ```text
//!   Idle ──off route──▶ Armed ──deadline passed, still off──▶ Rerouting
//!    ▲                    │                                      │
//!    └────back on route───┘◀──────────── finish / cancel ────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Serialize;

/// Identifies one path computation so late results can be told apart.
pub type RerouteRequestId = u64;

/// Cancellable one-shot deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DebounceTimer {
    deadline: Option<DateTime<Utc>>,
}

impl DebounceTimer {
    pub fn arm(&mut self, now: DateTime<Utc>, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RerouteState {
    Idle,
    ArmedOffRoute,
    Rerouting { request_id: RerouteRequestId },
}

#[derive(Debug, Clone)]
pub struct RerouteController {
    state: RerouteState,
    timer: DebounceTimer,
    debounce: Duration,
    next_id: RerouteRequestId,
}

impl RerouteController {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: RerouteState::Idle,
            timer: DebounceTimer::default(),
            debounce,
            next_id: 1,
        }
    }

    pub fn state(&self) -> RerouteState {
        self.state
    }

    pub fn is_rerouting(&self) -> bool {
        matches!(self.state, RerouteState::Rerouting { .. })
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.timer.deadline()
    }

    /// Feed one off-route observation. Returns a request id when a path
    /// computation should start now.
    pub fn observe(&mut self, off_route: bool, now: DateTime<Utc>) -> Option<RerouteRequestId> {
        match (self.state, off_route) {
            (RerouteState::Idle, true) => {
                self.timer.arm(now, self.debounce);
                self.state = RerouteState::ArmedOffRoute;
                debug!("off route, reroute armed until {:?}", self.timer.deadline());
                None
            }
            (RerouteState::ArmedOffRoute, false) => {
                self.timer.cancel();
                self.state = RerouteState::Idle;
                debug!("back on route, reroute disarmed");
                None
            }
            (RerouteState::ArmedOffRoute, true) => self.poll(now, true),
            _ => None,
        }
    }

    /// Check the debounce deadline without a new sample.
    pub fn poll(&mut self, now: DateTime<Utc>, still_off_route: bool) -> Option<RerouteRequestId> {
        if self.state != RerouteState::ArmedOffRoute || !self.timer.is_expired(now) {
            return None;
        }
        if !still_off_route {
            self.timer.cancel();
            self.state = RerouteState::Idle;
            return None;
        }
        Some(self.begin())
    }

    /// Manual reroute. Ignored while one is already in flight.
    pub fn trigger_manual(&mut self) -> Option<RerouteRequestId> {
        if self.is_rerouting() {
            return None;
        }
        Some(self.begin())
    }

    /// Settle a finished computation. Returns false for a stale id, whose
    /// result must be dropped.
    pub fn finish(&mut self, request_id: RerouteRequestId) -> bool {
        if self.state != (RerouteState::Rerouting { request_id }) {
            return false;
        }
        self.state = RerouteState::Idle;
        true
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
        self.state = RerouteState::Idle;
    }

    fn begin(&mut self) -> RerouteRequestId {
        let request_id = self.next_id;
        self.next_id += 1;
        self.timer.cancel();
        self.state = RerouteState::Rerouting { request_id };
        request_id
    }
}
