//! Navigation orchestrator.
//!
//! [`compute_navigation_state`] derives everything shown to the operator
//! from (position, route, completed set) and nothing else. [`Navigator`]
//! owns one session's mutable state around it. Every entry point first
//! recomputes the state, then queues side effects (speech, waypoint
//! completion, reroute requests) and drains the queue before returning,
//! so an effect caused by one sample never races the next one.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use crate::announce::{Announcement, AnnouncementScheduler};
use crate::config::NavigationConfig;
use crate::error::{NavError, PositionError};
use crate::geo::distance;
use crate::model::{
    Coordinate, NavigationState, PathResult, Position, Route, RouteStatus, RouteSummary, Waypoint,
};
use crate::progress::{calculate_eta, is_off_route, route_progress};
use crate::provider::{Clock, NavigationListener, SpeechService};
use crate::reroute::{RerouteController, RerouteRequestId, RerouteState};
use crate::steps::find_current_step;
use crate::waypoints::{find_next_waypoint, is_near_waypoint, WaypointMonitor};

/// A path computation the caller has to run and report back through
/// [`Navigator::apply_reroute`].
#[derive(Debug, Clone, PartialEq)]
pub struct PathRequest {
    pub request_id: RerouteRequestId,
    /// Current position followed by the remaining stops, in order.
    pub coordinates: Vec<Coordinate>,
}

#[derive(Debug)]
enum SideEffect {
    Speak(Announcement),
    CompleteWaypoint { id: String, arrived: bool },
    Reroute(RerouteRequestId),
}

/// Derive the navigation state for one sample.
///
/// `is_navigating` and `is_rerouting` are session flags and are left
/// false here. Waypoints count as completed when flagged on the route
/// or present in `completed`.
pub fn compute_navigation_state(
    position: Option<&Position>,
    route: &Route,
    completed: &BTreeSet<String>,
    config: &NavigationConfig,
) -> NavigationState {
    let waypoints: Vec<Waypoint> = route
        .waypoints
        .iter()
        .cloned()
        .map(|mut w| {
            w.is_completed |= completed.contains(&w.id);
            w
        })
        .collect();

    let next_waypoint = find_next_waypoint(&waypoints).cloned();
    let completed_waypoint_ids = waypoints
        .iter()
        .filter(|w| w.is_completed)
        .map(|w| w.id.clone())
        .collect();
    let steps = route.steps();

    let Some(position) = position else {
        let done = waypoints.iter().filter(|w| w.is_completed).count();
        return NavigationState {
            current_instruction: steps.first().map(|s| s.instruction.clone()),
            next_waypoint,
            route_progress: if waypoints.is_empty() {
                0.0
            } else {
                done as f64 * 100.0 / waypoints.len() as f64
            },
            completed_waypoint_ids,
            ..NavigationState::default()
        };
    };

    let here = &position.coordinates;
    let location = find_current_step(here, steps, config.maneuver_pass_tolerance_m);
    let distance_to_next_waypoint = next_waypoint.as_ref().map(|w| distance(here, &w.coordinates));

    NavigationState {
        is_navigating: false,
        current_step_index: location.step_index,
        current_instruction: steps.get(location.step_index).map(|s| s.instruction.clone()),
        distance_to_next_maneuver: location.distance_to_maneuver,
        eta_to_next_waypoint: distance_to_next_waypoint.map(|d| {
            calculate_eta(d, position.speed, config.fallback_speed_kmh, position.timestamp)
        }),
        next_waypoint,
        distance_to_next_waypoint,
        route_progress: route_progress(here, route.geometry(), &waypoints),
        is_off_route: is_off_route(here, route.geometry(), config.off_route_threshold_m),
        is_rerouting: false,
        completed_waypoint_ids,
    }
}

/// One navigation session over one route.
pub struct Navigator {
    route: Route,
    config: NavigationConfig,
    speech: Arc<dyn SpeechService>,
    listener: Arc<dyn NavigationListener>,
    clock: Arc<dyn Clock>,
    is_navigating: bool,
    last_position: Option<Position>,
    state: NavigationState,
    monitor: WaypointMonitor,
    announcements: AnnouncementScheduler,
    reroute: RerouteController,
    effects: VecDeque<SideEffect>,
    outgoing: Option<PathRequest>,
}

impl Navigator {
    pub fn new(
        route: Route,
        config: NavigationConfig,
        speech: Arc<dyn SpeechService>,
        listener: Arc<dyn NavigationListener>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NavError> {
        config.validate()?;
        route.validate()?;

        let monitor = WaypointMonitor::from_route(&route);
        let reroute = RerouteController::new(config.reroute_debounce());
        let mut navigator = Self {
            route,
            config,
            speech,
            listener,
            clock,
            is_navigating: false,
            last_position: None,
            state: NavigationState::default(),
            monitor,
            announcements: AnnouncementScheduler::new(),
            reroute,
            effects: VecDeque::new(),
            outgoing: None,
        };
        navigator.refresh_state();
        Ok(navigator)
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn is_navigating(&self) -> bool {
        self.is_navigating
    }

    pub fn last_position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn announcements(&self) -> &AnnouncementScheduler {
        &self.announcements
    }

    pub fn reroute_state(&self) -> RerouteState {
        self.reroute.state()
    }

    /// When the reroute debounce fires, if armed.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.reroute.deadline()
    }

    pub fn start_navigation(&mut self) {
        if self.route.status == RouteStatus::Completed {
            warn!("route {} is already completed", self.route.id);
            return;
        }

        self.announcements.reset();
        self.monitor.clear_pending();
        self.reroute.cancel();

        self.route.status = RouteStatus::Active;
        if self.route.started_at.is_none() {
            self.route.started_at = Some(self.clock.now());
        }
        self.is_navigating = true;
        info!("navigation started on route {}", self.route.id);

        if !self.route.steps().is_empty() {
            let start = self.announcements.for_start();
            self.effects.push_back(SideEffect::Speak(start));
        }
        self.drain();
    }

    pub fn stop_navigation(&mut self) {
        self.reroute.cancel();
        self.effects.clear();
        self.outgoing = None;
        self.speech.cancel();
        self.is_navigating = false;
        info!("navigation stopped on route {}", self.route.id);
        self.refresh_state();
    }

    /// Mark a waypoint done regardless of where the operator is.
    /// Completing an already-completed waypoint is a no-op.
    pub fn complete_waypoint(&mut self, id: &str) -> Result<(), NavError> {
        if self.route.waypoint(id).is_none() {
            return Err(NavError::UnknownWaypoint(id.to_string()));
        }
        self.effects.push_back(SideEffect::CompleteWaypoint {
            id: id.to_string(),
            arrived: false,
        });
        self.drain();
        Ok(())
    }

    /// Complete the next waypoint without the proximity check. Returns
    /// the completed id, or None when nothing is left.
    pub fn skip_to_next_waypoint(&mut self) -> Option<String> {
        let id = find_next_waypoint(&self.route.waypoints)?.id.clone();
        debug!("skipping waypoint {id}");
        self.effects.push_back(SideEffect::CompleteWaypoint {
            id: id.clone(),
            arrived: false,
        });
        self.drain();
        Some(id)
    }

    /// True when the last known position is close enough to complete
    /// the waypoint by hand.
    pub fn can_complete_waypoint(&self, id: &str) -> bool {
        match (self.route.waypoint(id), &self.last_position) {
            (Some(w), Some(p)) => {
                !w.is_completed
                    && is_near_waypoint(&p.coordinates, w, self.config.manual_completion_radius_m)
            }
            _ => false,
        }
    }

    /// Manual reroute. None while one is in flight, when not navigating,
    /// or when there is no fix or no remaining stop.
    pub fn reroute(&mut self) -> Option<PathRequest> {
        if !self.is_navigating {
            return None;
        }
        let request_id = self.reroute.trigger_manual()?;
        self.effects.push_back(SideEffect::Reroute(request_id));
        self.drain();
        self.outgoing.take()
    }

    /// Process one position sample.
    pub fn on_position(&mut self, position: Position) -> Option<PathRequest> {
        self.last_position = Some(position);
        self.refresh_state();
        if !self.is_navigating {
            return None;
        }

        self.plan_effects();
        self.drain();
        self.outgoing.take()
    }

    /// Time left until [`Self::next_deadline`], zero if already due.
    pub fn time_until_deadline(&self) -> Option<std::time::Duration> {
        let deadline = self.reroute.deadline()?;
        Some((deadline - self.clock.now()).to_std().unwrap_or_default())
    }

    /// Fire the reroute debounce if it elapsed since the last sample.
    pub fn poll_timers(&mut self) -> Option<PathRequest> {
        if !self.is_navigating {
            self.reroute.cancel();
            return None;
        }
        let request_id = self.reroute.poll(self.clock.now(), self.state.is_off_route)?;
        self.effects.push_back(SideEffect::Reroute(request_id));
        self.drain();
        self.outgoing.take()
    }

    /// Settle a path computation. A successful result replaces the path
    /// wholesale; a failure keeps the previous one. Results for a stale
    /// request are dropped.
    pub fn apply_reroute(
        &mut self,
        request_id: RerouteRequestId,
        result: Result<PathResult, NavError>,
    ) {
        if !self.reroute.finish(request_id) {
            debug!("dropping stale reroute result {request_id}");
            return;
        }

        match result {
            Ok(path) => {
                info!(
                    "reroute {request_id} applied: {:.0} m, {} steps",
                    path.distance,
                    path.steps.len()
                );
                self.route.apply_path(path);
                self.announcements.reset_steps();
            }
            Err(e) => warn!("reroute {request_id} failed, keeping previous path: {e}"),
        }
        self.refresh_state();
    }

    /// Surface a position source failure to the listener.
    pub fn report_position_error(&self, error: PositionError) {
        warn!("position source error: {error}");
        self.listener.on_position_error(&error);
    }

    fn refresh_state(&mut self) {
        let mut state = compute_navigation_state(
            self.last_position.as_ref(),
            &self.route,
            self.monitor.completed(),
            &self.config,
        );
        state.is_navigating = self.is_navigating;
        state.is_rerouting = self.reroute.is_rerouting();
        self.state = state;
    }

    fn plan_effects(&mut self) {
        let Some(here) = self.last_position.as_ref().map(|p| p.coordinates) else {
            return;
        };

        if let Some(instruction) = self.state.current_instruction.as_deref() {
            if let Some(a) = self.announcements.for_step(
                self.state.current_step_index,
                self.state.distance_to_next_maneuver,
                instruction,
                &self.config,
            ) {
                self.effects.push_back(SideEffect::Speak(a));
            }
        }

        let radius = self.config.arrival_radius_m;
        if let Some(id) = self.monitor.detect_arrival(&here, &self.route, radius) {
            debug!("arrival detected at waypoint {id}");
            self.effects.push_back(SideEffect::CompleteWaypoint { id, arrived: true });
        }

        if !self.state.is_off_route {
            self.announcements.back_on_route();
        }
        if let Some(request_id) = self.reroute.observe(self.state.is_off_route, self.clock.now()) {
            self.effects.push_back(SideEffect::Reroute(request_id));
        }
    }

    fn drain(&mut self) {
        while let Some(effect) = self.effects.pop_front() {
            match effect {
                SideEffect::Speak(a) => self.speak(&a),
                SideEffect::CompleteWaypoint { id, arrived } => self.finish_waypoint(&id, arrived),
                SideEffect::Reroute(request_id) => self.begin_reroute(request_id),
            }
        }
        self.refresh_state();
    }

    fn speak(&self, announcement: &Announcement) {
        if !self.config.voice_enabled {
            return;
        }
        if let Err(e) = self.speech.speak(&announcement.text, announcement.priority) {
            debug!("speech failed for {:?}: {e}", announcement.text);
        }
    }

    fn finish_waypoint(&mut self, id: &str, arrived: bool) {
        if !self.monitor.mark_completed(id) {
            return;
        }
        let now = self.clock.now();
        let Some(waypoint) = self.route.waypoint_mut(id) else {
            return;
        };
        waypoint.is_completed = true;
        waypoint.actual_arrival = Some(now);
        let waypoint = waypoint.clone();

        info!("waypoint {} completed", waypoint.id);
        self.listener.on_waypoint_complete(&waypoint);
        if arrived {
            if let Some(a) = self.announcements.for_arrival(&waypoint) {
                self.speak(&a);
            }
        }

        if self.route.is_fully_completed() {
            self.finish_route(now);
        }
    }

    fn finish_route(&mut self, now: DateTime<Utc>) {
        self.is_navigating = false;
        self.reroute.cancel();
        self.outgoing = None;

        self.route.status = RouteStatus::Completed;
        self.route.completed_at = Some(now);
        self.route.actual_duration = self
            .route
            .started_at
            .map(|start| (now - start).num_milliseconds() as f64 / 1000.0);

        let summary = RouteSummary {
            route_id: self.route.id.clone(),
            total_duration_secs: self.route.actual_duration.unwrap_or(0.0),
        };
        info!(
            "route {} completed in {:.0} s",
            summary.route_id, summary.total_duration_secs
        );

        let done = self.announcements.for_route_complete();
        self.speak(&done);
        self.listener.on_route_complete(&summary);
    }

    fn begin_reroute(&mut self, request_id: RerouteRequestId) {
        if !self.is_navigating {
            self.reroute.finish(request_id);
            return;
        }
        let Some(position) = &self.last_position else {
            warn!("reroute requested without a position fix");
            self.reroute.finish(request_id);
            return;
        };

        let mut coordinates = vec![position.coordinates];
        coordinates.extend(
            self.route
                .waypoints
                .iter()
                .filter(|w| !w.is_completed)
                .map(|w| w.coordinates),
        );
        if coordinates.len() < 2 {
            debug!("no remaining waypoints to reroute through");
            self.reroute.finish(request_id);
            return;
        }

        if let Some(a) = self.announcements.for_reroute() {
            self.speak(&a);
        }
        info!(
            "rerouting ({request_id}) through {} remaining waypoints",
            coordinates.len() - 1
        );
        self.outgoing = Some(PathRequest {
            request_id,
            coordinates,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::Priority;
    use crate::provider::ManualClock;
    use crate::testing::*;
    use chrono::Duration;

    struct Fixture {
        nav: Navigator,
        speech: Arc<RecordingSpeech>,
        listener: Arc<RecordingListener>,
        clock: Arc<ManualClock>,
    }

    fn fixture(route: Route) -> Fixture {
        fixture_with(route, RecordingSpeech::default())
    }

    fn fixture_with(route: Route, speech: RecordingSpeech) -> Fixture {
        let speech = Arc::new(speech);
        let listener = Arc::new(RecordingListener::default());
        let clock = Arc::new(ManualClock::new(t0()));
        let nav = Navigator::new(
            route,
            NavigationConfig::default(),
            speech.clone(),
            listener.clone(),
            clock.clone(),
        )
        .unwrap();
        Fixture {
            nav,
            speech,
            listener,
            clock,
        }
    }

    /// ~12 km from the Sydney route.
    fn far_away() -> Position {
        at(151.3000, -33.9000)
    }

    #[test]
    fn state_is_pure_function_of_inputs() {
        let route = sydney_route();
        let completed = BTreeSet::from(["w0".to_string()]);
        let p = at(151.2094, -33.8600).with_speed(4.0);
        let config = NavigationConfig::default();

        let first = compute_navigation_state(Some(&p), &route, &completed, &config);
        let second = compute_navigation_state(Some(&p), &route, &completed, &config);
        assert_eq!(first, second);
        assert_eq!(first.next_waypoint.as_ref().map(|w| w.id.as_str()), Some("w1"));
        assert_eq!(first.completed_waypoint_ids, vec!["w0".to_string()]);
        assert!(!first.is_off_route);
    }

    #[test]
    fn state_without_position_degrades() {
        let mut route = sydney_route();
        route.waypoints.clear();
        let state =
            compute_navigation_state(None, &route, &BTreeSet::new(), &NavigationConfig::default());
        assert!(state.next_waypoint.is_none());
        assert_eq!(state.route_progress, 0.0);
    }

    #[test]
    fn eta_is_based_on_sample_time() {
        let route = sydney_route();
        let p = at(151.2093, -33.8688).with_speed(10.0);
        let config = NavigationConfig::default();
        let state = compute_navigation_state(Some(&p), &route, &BTreeSet::new(), &config);
        let d = state.distance_to_next_waypoint.unwrap();
        let eta = state.eta_to_next_waypoint.unwrap();
        let expected = Duration::milliseconds((d / 10.0 * 1000.0).round() as i64);
        assert_eq!(eta - p.timestamp, expected);
    }

    #[test]
    fn near_zero_speed_uses_fallback_eta() {
        let route = sydney_route();
        let config = NavigationConfig::default();
        let p = at(151.2093, -33.8688).with_speed(1e-11);
        let state = compute_navigation_state(Some(&p), &route, &BTreeSet::new(), &config);
        let still = at(151.2093, -33.8688);
        let still = compute_navigation_state(Some(&still), &route, &BTreeSet::new(), &config);
        assert_eq!(state.eta_to_next_waypoint, still.eta_to_next_waypoint);
        assert!(state.eta_to_next_waypoint.unwrap() > p.timestamp);
    }

    #[test]
    fn replaying_a_sample_gives_identical_state() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        let p = at(151.2093, -33.8660);
        f.nav.on_position(p.clone());
        let first = f.nav.state().clone();
        f.nav.on_position(p);
        assert_eq!(&first, f.nav.state());
    }

    #[test]
    fn start_sets_active_and_announces() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        assert!(f.nav.state().is_navigating);
        assert_eq!(f.nav.route().status, RouteStatus::Active);
        assert_eq!(f.nav.route().started_at, Some(t0()));
        assert_eq!(f.speech.texts(), vec!["Navigation started".to_string()]);
    }

    #[test]
    fn start_without_steps_is_silent() {
        let mut route = sydney_route();
        route.navigation_steps = None;
        let mut f = fixture(route);
        f.nav.start_navigation();
        assert!(f.speech.texts().is_empty());
    }

    #[test]
    fn sequential_completion_finishes_route() {
        let mut f = fixture(sydney_route());
        assert_eq!(f.nav.route().status, RouteStatus::Draft);
        f.nav.start_navigation();
        assert_eq!(f.nav.route().status, RouteStatus::Active);

        for id in ["w0", "w1", "w2"] {
            f.clock.advance(Duration::seconds(60));
            f.nav.complete_waypoint(id).unwrap();
        }

        let route = f.nav.route();
        assert!(!f.nav.state().is_navigating);
        assert_eq!(route.status, RouteStatus::Completed);
        assert!(route.completed_at.is_some());
        assert!(route.actual_duration.unwrap() > 0.0);
        assert_eq!(route.actual_duration, Some(180.0));

        assert_eq!(*f.listener.waypoints.lock().unwrap(), vec!["w0", "w1", "w2"]);
        let routes = f.listener.routes.lock().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].total_duration_secs, 180.0);
        assert!(f.speech.texts().last().unwrap().starts_with("Route complete"));
    }

    #[test]
    fn complete_waypoint_is_idempotent() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        f.nav.complete_waypoint("w0").unwrap();
        f.nav.complete_waypoint("w0").unwrap();
        assert_eq!(f.listener.waypoints.lock().unwrap().len(), 1);
    }

    #[test]
    fn unknown_waypoint_is_an_error() {
        let mut f = fixture(sydney_route());
        assert!(matches!(
            f.nav.complete_waypoint("nope"),
            Err(NavError::UnknownWaypoint(id)) if id == "nope"
        ));
    }

    #[test]
    fn skip_completes_next_in_order() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        assert_eq!(f.nav.skip_to_next_waypoint().as_deref(), Some("w0"));
        assert_eq!(f.nav.skip_to_next_waypoint().as_deref(), Some("w1"));
        assert_eq!(
            f.nav.state().next_waypoint.as_ref().map(|w| w.id.as_str()),
            Some("w2")
        );
    }

    #[test]
    fn arrival_completes_and_announces_once() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        let at_depot = at(151.2093, -33.8629);

        f.nav.on_position(at_depot.clone());
        f.nav.on_position(at_depot);

        let depot = f.nav.route().waypoint("w0").unwrap();
        assert!(depot.is_completed);
        assert_eq!(depot.actual_arrival, Some(t0()));
        assert_eq!(*f.listener.waypoints.lock().unwrap(), vec!["w0"]);

        let spoken = f.speech.spoken.lock().unwrap();
        let arrivals: Vec<_> = spoken.iter().filter(|(t, _)| t == "Arriving at Depot").collect();
        assert_eq!(arrivals.len(), 1);
        assert_eq!(arrivals[0].1, Priority::High);
        assert_eq!(
            f.nav.state().next_waypoint.as_ref().map(|w| w.id.as_str()),
            Some("w1")
        );
    }

    #[test]
    fn can_complete_within_manual_radius() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        assert!(!f.nav.can_complete_waypoint("w1"));
        // ~80 m short of w1
        f.nav.on_position(at(151.2093, -33.85752));
        assert!(f.nav.can_complete_waypoint("w1"));
        assert!(!f.nav.can_complete_waypoint("w2"));
    }

    #[test]
    fn step_announcements_follow_distance() {
        let corner = Coordinate::new(151.2093, -33.8598);
        let end = Coordinate::new(151.2193, -33.8598);
        let route = Route::new("l", vec![Waypoint::new("end", end, 0)])
            .with_path(straight_path(&[Coordinate::new(151.2093, -33.8688), corner, end]));
        let mut f = fixture(route);
        f.nav.start_navigation();

        // ~180 m before the corner
        f.nav.on_position(at(151.2093, -33.86142));
        assert_eq!(f.nav.state().current_step_index, 1);
        // ~30 m before
        f.nav.on_position(at(151.2093, -33.86007));
        f.nav.on_position(at(151.2093, -33.86005));

        let spoken = f.speech.spoken.lock().unwrap();
        assert_eq!(spoken.len(), 3);
        assert_eq!(spoken[0].0, "Navigation started");
        assert!(spoken[1].0.starts_with("In 1"), "got {:?}", spoken[1].0);
        assert!(spoken[1].0.ends_with("turn right"));
        assert_eq!(spoken[1].1, Priority::Low);
        assert_eq!(spoken[2], ("Turn right".to_string(), Priority::High));
    }

    #[test]
    fn off_route_reroutes_after_debounce() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();

        assert_eq!(f.nav.on_position(far_away()), None);
        assert!(f.nav.state().is_off_route);
        assert_eq!(f.nav.reroute_state(), RerouteState::ArmedOffRoute);
        assert_eq!(f.nav.next_deadline(), Some(t0() + Duration::milliseconds(2000)));

        f.clock.advance(Duration::milliseconds(1000));
        assert_eq!(f.nav.on_position(far_away()), None);

        f.clock.advance(Duration::milliseconds(1000));
        let request = f.nav.on_position(far_away()).unwrap();
        assert_eq!(request.coordinates.len(), 4);
        assert_eq!(request.coordinates[0], far_away().coordinates);
        assert!(f.nav.state().is_rerouting);

        // Still off route: no second request while one is in flight
        f.clock.advance(Duration::milliseconds(5000));
        assert_eq!(f.nav.on_position(far_away()), None);
        assert_eq!(f.nav.poll_timers(), None);
        assert_eq!(f.nav.reroute(), None);

        let texts = f.speech.texts();
        assert_eq!(texts.iter().filter(|t| *t == "Recalculating route").count(), 1);
    }

    #[test]
    fn successful_reroute_replaces_path() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        f.nav.on_position(far_away());
        f.clock.advance(Duration::milliseconds(2000));
        let request = f.nav.poll_timers().unwrap();
        assert!(f.nav.announcements().reroute_announced);

        f.nav.apply_reroute(request.request_id, Ok(straight_path(&request.coordinates)));

        assert_eq!(f.nav.reroute_state(), RerouteState::Idle);
        assert!(!f.nav.state().is_rerouting);
        assert!(!f.nav.state().is_off_route);
        assert_eq!(f.nav.route().geometry(), request.coordinates.as_slice());
        assert_eq!(f.nav.announcements().last_advance_step, None);
        assert_eq!(f.nav.announcements().last_immediate_step, None);
    }

    #[test]
    fn failed_reroute_keeps_path_and_rearms() {
        let mut f = fixture(sydney_route());
        let original = f.nav.route().geometry.clone();
        f.nav.start_navigation();
        f.nav.on_position(far_away());
        f.clock.advance(Duration::milliseconds(2000));
        let request = f.nav.poll_timers().unwrap();

        f.nav.apply_reroute(
            request.request_id,
            Err(NavError::PathComputationFailed("timeout".into())),
        );
        assert_eq!(f.nav.route().geometry, original);
        assert!(!f.nav.state().is_rerouting);

        f.nav.on_position(far_away());
        assert_eq!(f.nav.reroute_state(), RerouteState::ArmedOffRoute);
        f.clock.advance(Duration::milliseconds(2000));
        assert!(f.nav.poll_timers().is_some());
        // Same excursion: announced only once
        let texts = f.speech.texts();
        assert_eq!(texts.iter().filter(|t| *t == "Recalculating route").count(), 1);
    }

    #[test]
    fn back_on_route_cancels_debounce() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        f.nav.on_position(far_away());
        f.clock.advance(Duration::milliseconds(1000));
        f.nav.on_position(at(151.2093, -33.8660));
        assert_eq!(f.nav.reroute_state(), RerouteState::Idle);
        assert_eq!(f.nav.next_deadline(), None);
        f.clock.advance(Duration::milliseconds(5000));
        assert_eq!(f.nav.poll_timers(), None);
    }

    #[test]
    fn nothing_fires_after_stop() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        f.nav.on_position(far_away());
        f.nav.stop_navigation();
        assert_eq!(f.speech.cancel_count(), 1);
        assert!(!f.nav.state().is_navigating);
        assert_eq!(f.nav.next_deadline(), None);

        f.clock.advance(Duration::milliseconds(3000));
        assert_eq!(f.nav.poll_timers(), None);
        assert_eq!(f.nav.on_position(far_away()), None);
        assert_eq!(f.nav.reroute_state(), RerouteState::Idle);
    }

    #[test]
    fn stale_result_after_stop_is_dropped() {
        let mut f = fixture(sydney_route());
        let original = f.nav.route().geometry.clone();
        f.nav.start_navigation();
        f.nav.on_position(far_away());
        let request = f.nav.reroute().unwrap();
        f.nav.stop_navigation();

        f.nav.apply_reroute(request.request_id, Ok(straight_path(&request.coordinates)));
        assert_eq!(f.nav.route().geometry, original);
    }

    #[test]
    fn manual_reroute_needs_a_fix() {
        let mut f = fixture(sydney_route());
        f.nav.start_navigation();
        assert_eq!(f.nav.reroute(), None);
        assert_eq!(f.nav.reroute_state(), RerouteState::Idle);
    }

    #[test]
    fn speech_failures_are_swallowed() {
        let mut f = fixture_with(sydney_route(), RecordingSpeech::failing());
        f.nav.start_navigation();
        f.nav.on_position(at(151.2093, -33.8629));
        assert!(f.nav.route().waypoint("w0").unwrap().is_completed);
    }

    #[test]
    fn samples_while_stopped_only_update_state() {
        let mut f = fixture(sydney_route());
        f.nav.on_position(at(151.2093, -33.8629));
        assert!(!f.nav.route().waypoint("w0").unwrap().is_completed);
        assert!(f.nav.state().distance_to_next_waypoint.unwrap() < 50.0);
        assert!(f.speech.texts().is_empty());
    }
}
