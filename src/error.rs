//! Error types.

use thiserror::Error;

/// Failures reported by the position source.
///
/// Navigation cannot make progress without a fix, so these are surfaced
/// to the caller unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    Unavailable,
    #[error("location request timed out")]
    Timeout,
}

/// Route data that breaks the waypoint ordering rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route has no waypoints")]
    Empty,
    #[error("duplicate waypoint order {0}")]
    DuplicateOrder(u32),
    #[error("waypoint order not contiguous: expected {expected}, found {found}")]
    NonContiguousOrder { expected: u32, found: u32 },
    #[error("duplicate waypoint id {0}")]
    DuplicateId(String),
}

/// Speech output failures. Always best-effort, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("speech not supported on this device")]
    Unsupported,
    #[error("utterance interrupted")]
    Interrupted,
    #[error("speech failed: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum NavError {
    #[error("position error: {0}")]
    Position(#[from] PositionError),

    #[error("path computation failed: {0}")]
    PathComputationFailed(String),

    #[error("unknown waypoint: {0}")]
    UnknownWaypoint(String),

    #[error("invalid route: {0}")]
    InvalidRoute(#[from] RouteError),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("GPX parse error: {0}")]
    Gpx(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
