//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::controller::{DeviceSnapshot, ModeConstants};
use crate::device::EndpointKind;
use crate::events::{PlatformEvent, RouteEvent};
use crate::platform::DeviceType;

/// Requests from the application layer or the platform bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Mode constants
    GetConstants,

    /// Available devices and current selection
    GetAudioDevices,

    /// Select a device by category name (fire-and-forget)
    SetAudioDevice { device: String },

    /// Set the conversation mode by numeric value
    SetMode { mode: i64 },

    /// Platform notification forwarded by the bridge
    PlatformEvent { event: PlatformEvent },

    /// Replace the attached-device list and trigger a rescan
    ReportDevices { devices: Vec<DeviceType> },

    /// Subscribe to route event notifications
    Subscribe,
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Mode constants
    Constants(ModeConstants),

    /// Device listing
    AudioDevices {
        devices: Vec<EndpointKind>,
        selected: Option<EndpointKind>,
    },

    /// Mode was set
    ModeSet { mode: i64 },

    /// Request queued
    Accepted,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl From<DeviceSnapshot> for Response {
    fn from(snapshot: DeviceSnapshot) -> Self {
        Response::AudioDevices {
            devices: snapshot.devices,
            selected: snapshot.selected,
        }
    }
}

/// Push notification to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "event", rename_all = "snake_case")]
pub enum Notification {
    RouteEvent(RouteEvent),
}
