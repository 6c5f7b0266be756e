//! Platform audio subsystem abstraction
//!
//! The routing core never talks to an OS audio API directly. Everything it
//! needs from the platform goes through [`AudioPlatform`]: device
//! enumeration, the route primitives used by both route strategies, and
//! audio focus.

mod recording;

use serde::{Deserialize, Serialize};

use crate::device::EndpointKind;
use crate::error::PlatformError;

pub use recording::{PlatformCall, RecordingPlatform};

/// Physical device type as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    BluetoothSco,
    BuiltinEarpiece,
    BuiltinSpeaker,
    WiredHeadphones,
    WiredHeadset,
    UsbHeadset,
    /// Anything the routing core has no category for
    Other(String),
}

impl DeviceType {
    /// The endpoint category this device collapses into, if any
    pub fn endpoint(&self) -> Option<EndpointKind> {
        match self {
            DeviceType::BluetoothSco => Some(EndpointKind::Bluetooth),
            DeviceType::BuiltinEarpiece => Some(EndpointKind::Earpiece),
            DeviceType::BuiltinSpeaker => Some(EndpointKind::Speaker),
            DeviceType::WiredHeadphones | DeviceType::WiredHeadset | DeviceType::UsbHeadset => {
                Some(EndpointKind::WiredHeadset)
            }
            DeviceType::Other(_) => None,
        }
    }
}

impl From<String> for DeviceType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "bluetooth_sco" => DeviceType::BluetoothSco,
            "builtin_earpiece" => DeviceType::BuiltinEarpiece,
            "builtin_speaker" => DeviceType::BuiltinSpeaker,
            "wired_headphones" => DeviceType::WiredHeadphones,
            "wired_headset" => DeviceType::WiredHeadset,
            "usb_headset" => DeviceType::UsbHeadset,
            _ => DeviceType::Other(name),
        }
    }
}

impl From<DeviceType> for String {
    fn from(device: DeviceType) -> Self {
        match device {
            DeviceType::BluetoothSco => "bluetooth_sco".into(),
            DeviceType::BuiltinEarpiece => "builtin_earpiece".into(),
            DeviceType::BuiltinSpeaker => "builtin_speaker".into(),
            DeviceType::WiredHeadphones => "wired_headphones".into(),
            DeviceType::WiredHeadset => "wired_headset".into(),
            DeviceType::UsbHeadset => "usb_headset".into(),
            DeviceType::Other(name) => name,
        }
    }
}

/// Overall platform audio mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformAudioMode {
    Normal,
    InCommunication,
}

/// Result of an audio focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Granted,
    Failed,
}

/// Synchronous platform audio primitives.
///
/// Implementations are owned by the controller worker and called only from
/// it, so they need `Send` but not `Sync`.
pub trait AudioPlatform: Send {
    /// Full list of attached output devices
    fn list_devices(&self) -> Result<Vec<DeviceType>, PlatformError>;

    /// Whether the device has telephony hardware (and therefore an earpiece)
    fn has_telephony(&self) -> bool;

    fn set_audio_mode(&self, mode: PlatformAudioMode) -> Result<(), PlatformError>;

    fn set_microphone_mute(&self, muted: bool) -> Result<(), PlatformError>;

    fn set_speakerphone_on(&self, on: bool) -> Result<(), PlatformError>;

    fn start_bluetooth_sco(&self) -> Result<(), PlatformError>;

    fn stop_bluetooth_sco(&self) -> Result<(), PlatformError>;

    fn set_bluetooth_sco_on(&self, on: bool) -> Result<(), PlatformError>;

    /// Request exclusive audio focus for voice communication
    fn request_audio_focus(&self) -> Result<FocusRequest, PlatformError>;

    fn abandon_audio_focus(&self) -> Result<(), PlatformError>;

    /// Hand a route id to the platform call-routing subsystem
    fn set_call_audio_route(&self, route: u32) -> Result<(), PlatformError>;
}
