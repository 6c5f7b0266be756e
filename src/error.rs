//! Error types shared across the routing core

/// Failures reported to callers of `set_mode`.
///
/// The display strings are part of the client-facing contract; clients
/// match on the `Failed to set audio mode to N` prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioModeError {
    #[error("Invalid audio mode {0}")]
    InvalidMode(i64),

    #[error("Failed to set audio mode to {0}: audio focus denied")]
    FocusDenied(i64),

    #[error("Failed to set audio mode to {0}")]
    RouteUpdateFailed(i64),

    #[error("audio controller is not running")]
    ControllerGone,
}

impl AudioModeError {
    /// Short machine-readable code used in IPC error responses
    pub fn code(&self) -> &'static str {
        match self {
            AudioModeError::InvalidMode(_) => "invalid_mode",
            AudioModeError::FocusDenied(_) => "focus_denied",
            AudioModeError::RouteUpdateFailed(_) => "route_update_failed",
            AudioModeError::ControllerGone => "controller_gone",
        }
    }
}

/// Errors raised by a platform audio backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("platform call {call} failed: {reason}")]
    CallFailed { call: &'static str, reason: String },

    #[error("platform audio subsystem unavailable: {0}")]
    Unavailable(String),
}

/// Errors from a single route update attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("audio focus request denied")]
    FocusDenied,

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Errors starting or registering the controller worker
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("failed to spawn audio controller thread: {0}")]
    ThreadSpawn(String),

    #[error("a global audio controller is already installed")]
    AlreadyInstalled,
}

/// A device category name that is not one of the known endpoints
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown audio device: {0}")]
pub struct UnknownDevice(pub String);
