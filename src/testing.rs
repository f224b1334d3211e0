//! Recording fakes shared by the navigator and session tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::announce::Priority;
use crate::error::{NavError, PositionError, SpeechError};
use crate::maneuver::generate_steps;
use crate::model::{Coordinate, PathResult, Position, Route, RouteSummary, Waypoint};
use crate::provider::{NavigationListener, PathProvider, SpeechService};

pub fn t0() -> DateTime<Utc> {
    "2024-12-24T10:00:00Z".parse().unwrap()
}

pub fn at(lon: f64, lat: f64) -> Position {
    Position::new(Coordinate::new(lon, lat), t0())
}

/// Straight ~2 km path north through central Sydney with three stops.
pub fn sydney_route() -> Route {
    let start = Coordinate::new(151.2093, -33.8688);
    let end = Coordinate::new(151.2093, -33.8508);
    let waypoints = vec![
        Waypoint::new("w0", Coordinate::new(151.2093, -33.8628), 0).with_name("Depot"),
        Waypoint::new("w1", Coordinate::new(151.2093, -33.8568), 1).with_name("Market"),
        Waypoint::new("w2", end, 2).with_name("Harbour"),
    ];
    Route::new("sydney", waypoints).with_path(straight_path(&[start, end]))
}

pub fn straight_path(points: &[Coordinate]) -> PathResult {
    let steps = generate_steps(points, 10.0);
    PathResult {
        geometry: points.to_vec(),
        distance: steps.iter().map(|s| s.distance).sum(),
        duration: steps.iter().map(|s| s.duration).sum(),
        steps,
    }
}

#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<(String, Priority)>>,
    pub cancels: AtomicUsize,
    pub fail: bool,
}

impl RecordingSpeech {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl SpeechService for RecordingSpeech {
    fn speak(&self, text: &str, priority: Priority) -> Result<(), SpeechError> {
        if self.fail {
            return Err(SpeechError::Unsupported);
        }
        self.spoken.lock().unwrap().push((text.to_string(), priority));
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub waypoints: Mutex<Vec<String>>,
    pub routes: Mutex<Vec<RouteSummary>>,
    pub errors: Mutex<Vec<PositionError>>,
}

impl NavigationListener for RecordingListener {
    fn on_waypoint_complete(&self, waypoint: &Waypoint) {
        self.waypoints.lock().unwrap().push(waypoint.id.clone());
    }

    fn on_route_complete(&self, summary: &RouteSummary) {
        self.routes.lock().unwrap().push(summary.clone());
    }

    fn on_position_error(&self, error: &PositionError) {
        self.errors.lock().unwrap().push(*error);
    }
}

/// Path provider that records every call and answers after `delay`.
pub struct FakePathProvider {
    pub calls: Mutex<Vec<Vec<Coordinate>>>,
    pub delay: Duration,
    pub fail: bool,
}

impl FakePathProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            delay,
            fail: false,
        }
    }

    pub fn failing(delay: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(delay)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PathProvider for FakePathProvider {
    async fn compute_path(&self, coordinates: &[Coordinate]) -> Result<PathResult, NavError> {
        self.calls.lock().unwrap().push(coordinates.to_vec());
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(NavError::PathComputationFailed("no route found".into()));
        }
        Ok(straight_path(coordinates))
    }
}
