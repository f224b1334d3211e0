//! Async session driver.
//!
//! Runs a [`Navigator`] on a tokio task. Position samples, caller
//! commands, the reroute debounce deadline and the one in-flight path
//! computation are multiplexed with `select!`, and each event runs to
//! completion before the next one is taken. The derived state is
//! published on a watch channel after every event.

use log::{debug, info, warn};
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{NavError, PositionError};
use crate::model::{NavigationState, PathResult, Position};
use crate::navigator::{Navigator, PathRequest};
use crate::provider::PathProvider;
use crate::reroute::RerouteRequestId;

/// What the position source delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Sample(Position),
    Error(PositionError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Start,
    Stop,
    CompleteWaypoint(String),
    SkipToNextWaypoint,
    Reroute,
    Shutdown,
}

struct InFlight {
    request_id: RerouteRequestId,
    handle: JoinHandle<Result<PathResult, NavError>>,
}

pub struct NavigationSession {
    navigator: Navigator,
    provider: Arc<dyn PathProvider>,
}

impl NavigationSession {
    pub fn new(navigator: Navigator, provider: Arc<dyn PathProvider>) -> Self {
        Self {
            navigator,
            provider,
        }
    }

    /// Drive the session until both input channels close or a
    /// [`SessionCommand::Shutdown`] arrives. Returns the navigator so the
    /// final route and state can be inspected.
    pub async fn run(
        self,
        mut positions: mpsc::Receiver<PositionEvent>,
        mut commands: mpsc::Receiver<SessionCommand>,
        state_tx: watch::Sender<NavigationState>,
    ) -> Navigator {
        let Self { mut navigator, provider } = self;
        let mut in_flight: Option<InFlight> = None;
        let mut positions_open = true;
        let mut commands_open = true;

        state_tx.send_replace(navigator.state().clone());
        info!("navigation session running for route {}", navigator.route().id);

        while positions_open || commands_open {
            let timer = navigator.time_until_deadline();

            // Commands first: a queued Start or Stop applies before samples sent after it.
            tokio::select! {
                biased;

                command = commands.recv(), if commands_open => match command {
                    Some(SessionCommand::Shutdown) => break,
                    Some(command) => {
                        let request = handle_command(&mut navigator, command);
                        dispatch(&provider, &mut in_flight, request);
                    }
                    None => commands_open = false,
                },
                event = positions.recv(), if positions_open => match event {
                    Some(PositionEvent::Sample(position)) => {
                        let request = navigator.on_position(position);
                        dispatch(&provider, &mut in_flight, request);
                    }
                    Some(PositionEvent::Error(error)) => navigator.report_position_error(error),
                    None => {
                        debug!("position source closed");
                        positions_open = false;
                    }
                },
                _ = sleep_for(timer), if timer.is_some() => {
                    let request = navigator.poll_timers();
                    dispatch(&provider, &mut in_flight, request);
                }
                (request_id, result) = join(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    navigator.apply_reroute(request_id, result);
                }
            }

            if !navigator.is_navigating() {
                abort(&mut in_flight);
            }
            state_tx.send_replace(navigator.state().clone());
        }

        abort(&mut in_flight);
        info!("navigation session ended for route {}", navigator.route().id);
        navigator
    }
}

fn handle_command(navigator: &mut Navigator, command: SessionCommand) -> Option<PathRequest> {
    debug!("session command {command:?}");
    match command {
        SessionCommand::Start => navigator.start_navigation(),
        SessionCommand::Stop => navigator.stop_navigation(),
        SessionCommand::CompleteWaypoint(id) => {
            if let Err(e) = navigator.complete_waypoint(&id) {
                warn!("cannot complete waypoint: {e}");
            }
        }
        SessionCommand::SkipToNextWaypoint => {
            navigator.skip_to_next_waypoint();
        }
        SessionCommand::Reroute => return navigator.reroute(),
        SessionCommand::Shutdown => {}
    }
    None
}

fn dispatch(
    provider: &Arc<dyn PathProvider>,
    in_flight: &mut Option<InFlight>,
    request: Option<PathRequest>,
) {
    let Some(PathRequest {
        request_id,
        coordinates,
    }) = request
    else {
        return;
    };
    abort(in_flight);

    let provider = Arc::clone(provider);
    let handle = tokio::spawn(async move { provider.compute_path(&coordinates).await });
    *in_flight = Some(InFlight { request_id, handle });
}

fn abort(in_flight: &mut Option<InFlight>) {
    if let Some(task) = in_flight.take() {
        debug!("aborting path computation {}", task.request_id);
        task.handle.abort();
    }
}

async fn join(
    in_flight: &mut Option<InFlight>,
) -> (RerouteRequestId, Result<PathResult, NavError>) {
    match in_flight {
        Some(task) => {
            let result = match (&mut task.handle).await {
                Ok(result) => result,
                Err(e) => Err(NavError::PathComputationFailed(format!("path task failed: {e}"))),
            };
            (task.request_id, result)
        }
        None => pending().await,
    }
}

async fn sleep_for(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => pending().await,
    }
}
