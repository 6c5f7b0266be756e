//! Events module
//!
//! Two directions:
//! - [`PlatformEvent`]: notifications from the platform audio subsystem,
//!   queued onto the controller worker
//! - [`RouteEvent`]: changes broadcast by the controller to subscribers

use serde::{Deserialize, Serialize};

use crate::controller::AudioMode;
use crate::device::EndpointKind;

/// Audio focus change reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    Gain,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

/// Notifications arriving from the platform on arbitrary threads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Devices were attached or detached; rescan the platform list
    DevicesChanged,

    /// Wired headset plugged or unplugged
    HeadsetPlug { present: bool },

    /// Bluetooth headset connected or disconnected
    BluetoothHeadset { present: bool },

    /// Call-routing subsystem reported its state
    CallAudioState {
        /// Route id currently in use by the platform
        route: u32,
        /// Bitmask of routes the platform can use
        supported_route_mask: u32,
    },

    /// Audio focus changed
    AudioFocus { change: FocusChange },
}

/// Events broadcast by the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteEvent {
    /// Mode changed after a successful `set_mode`
    ModeChanged {
        mode: AudioMode,
        /// `None` if no mode had been set before
        previous: Option<AudioMode>,
    },

    /// Call audio was routed to a new endpoint
    RouteApplied { device: EndpointKind },

    /// The set of available endpoints changed
    DevicesChanged { devices: Vec<EndpointKind> },

    /// Another party took audio focus
    FocusLost,

    /// Focus came back and the route was restored
    FocusRestored,
}

impl std::fmt::Display for RouteEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteEvent::ModeChanged { mode, previous } => match previous {
                Some(previous) => write!(f, "MODE_CHANGED ({} -> {})", previous, mode),
                None => write!(f, "MODE_CHANGED ({})", mode),
            },
            RouteEvent::RouteApplied { device } => write!(f, "ROUTE_APPLIED ({})", device),
            RouteEvent::DevicesChanged { devices } => {
                write!(f, "DEVICES_CHANGED ({} devices)", devices.len())
            }
            RouteEvent::FocusLost => write!(f, "FOCUS_LOST"),
            RouteEvent::FocusRestored => write!(f, "FOCUS_RESTORED"),
        }
    }
}
