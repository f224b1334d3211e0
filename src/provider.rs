//! Collaborator contracts.
//!
//! Path finding, speech output and completion callbacks live outside
//! this crate; the navigator talks to them through these traits.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use crate::announce::Priority;
use crate::error::{NavError, PositionError, SpeechError};
use crate::model::{Coordinate, PathResult, RouteSummary, Waypoint};

/// Computes a path through the given coordinates, in order.
#[async_trait]
pub trait PathProvider: Send + Sync {
    async fn compute_path(&self, coordinates: &[Coordinate]) -> Result<PathResult, NavError>;
}

/// Text-to-speech output.
///
/// `speak` must not block: implementations queue the utterance and
/// return. A `High` utterance interrupts a `Low` one in progress.
pub trait SpeechService: Send + Sync {
    fn speak(&self, text: &str, priority: Priority) -> Result<(), SpeechError>;
    fn cancel(&self);
}

/// Callbacks from the navigator's side-effect pass.
pub trait NavigationListener: Send + Sync {
    fn on_waypoint_complete(&self, _waypoint: &Waypoint) {}
    fn on_route_complete(&self, _summary: &RouteSummary) {}
    fn on_position_error(&self, _error: &PositionError) {}
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall time driven by the tokio clock, so a paused runtime also pauses
/// the navigator's notion of time.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.origin.elapsed()).unwrap_or(Duration::zero());
        self.epoch + elapsed
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
