//! Turn-by-turn guidance for multi-stop delivery routes.
//!
//! The pure functions in [`geo`], [`steps`], [`progress`] and
//! [`waypoints`] derive a [`NavigationState`] from a route and a
//! position. [`navigator::Navigator`] adds the stateful parts (arrival
//! detection, voice announcements, rerouting) and
//! [`session::NavigationSession`] drives it from async event sources.

pub mod android_jni;
pub mod announce;
pub mod config;
pub mod error;
pub mod geo;
pub mod gpx;
pub mod maneuver;
pub mod model;
pub mod navigator;
pub mod progress;
pub mod provider;
pub mod reroute;
pub mod session;
pub mod steps;
pub mod waypoints;

#[cfg(test)]
mod testing;

pub use config::NavigationConfig;
pub use error::{NavError, PositionError, RouteError, SpeechError};
pub use model::{Coordinate, NavigationState, NavigationStep, PathResult, Position, Route, Waypoint};
pub use navigator::{compute_navigation_state, Navigator};
pub use session::{NavigationSession, PositionEvent, SessionCommand};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
