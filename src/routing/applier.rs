//! Route application strategies
//!
//! Two ways of moving call audio to an endpoint, picked once at startup:
//! - [`CallRoutingStrategy`]: hand a route id to the platform call-routing
//!   subsystem and trust it
//! - [`DirectStrategy`]: flip speakerphone and Bluetooth SCO directly, and
//!   own the platform audio mode, microphone mute and audio focus

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::device::EndpointKind;
use crate::error::{PlatformError, RouteError};
use crate::platform::{AudioPlatform, FocusRequest, PlatformAudioMode};

/// Routing capability of the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// A call-routing subsystem accepts route ids (capability A)
    CallRouting,
    /// Only the raw speaker/SCO switches are available (capability B)
    Direct,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::CallRouting => write!(f, "call-routing"),
            Capability::Direct => write!(f, "direct"),
        }
    }
}

/// Applies routing decisions to the platform
pub trait RouteStrategy: Send {
    fn capability(&self) -> Capability;

    /// Restore default routing when leaving a call
    fn reset(&mut self, platform: &dyn AudioPlatform) -> Result<(), PlatformError>;

    /// Make the platform ready for a call before selection runs
    fn prepare(&mut self, platform: &dyn AudioPlatform) -> Result<(), RouteError>;

    /// Route call audio to `endpoint`
    fn apply(
        &mut self,
        platform: &dyn AudioPlatform,
        endpoint: EndpointKind,
    ) -> Result<(), RouteError>;
}

/// Build the strategy matching `capability`
pub fn strategy_for(capability: Capability) -> Box<dyn RouteStrategy> {
    match capability {
        Capability::CallRouting => Box::new(CallRoutingStrategy),
        Capability::Direct => Box::new(DirectStrategy),
    }
}

/// Delegates to the platform call-routing subsystem
#[derive(Debug, Default)]
pub struct CallRoutingStrategy;

impl RouteStrategy for CallRoutingStrategy {
    fn capability(&self) -> Capability {
        Capability::CallRouting
    }

    fn reset(&mut self, _platform: &dyn AudioPlatform) -> Result<(), PlatformError> {
        // The call-routing subsystem restores routing when the call ends
        Ok(())
    }

    fn prepare(&mut self, _platform: &dyn AudioPlatform) -> Result<(), RouteError> {
        Ok(())
    }

    fn apply(
        &mut self,
        platform: &dyn AudioPlatform,
        endpoint: EndpointKind,
    ) -> Result<(), RouteError> {
        let route = endpoint.route_bit();
        debug!(device = %endpoint, route, "setting call audio route");
        platform.set_call_audio_route(route)?;
        Ok(())
    }
}

/// Drives speakerphone and Bluetooth SCO switches directly
#[derive(Debug, Default)]
pub struct DirectStrategy;

impl DirectStrategy {
    fn set_bluetooth(platform: &dyn AudioPlatform, enabled: bool) -> Result<(), PlatformError> {
        if enabled {
            platform.start_bluetooth_sco()?;
            platform.set_bluetooth_sco_on(true)
        } else {
            platform.set_bluetooth_sco_on(false)?;
            platform.stop_bluetooth_sco()
        }
    }
}

impl RouteStrategy for DirectStrategy {
    fn capability(&self) -> Capability {
        Capability::Direct
    }

    fn reset(&mut self, platform: &dyn AudioPlatform) -> Result<(), PlatformError> {
        // Every step runs even if an earlier one failed
        let steps = [
            platform.set_audio_mode(PlatformAudioMode::Normal),
            platform.abandon_audio_focus(),
            platform.set_speakerphone_on(false),
            platform.set_bluetooth_sco_on(false),
            platform.stop_bluetooth_sco(),
        ];

        let mut first_error = None;
        for result in steps {
            if let Err(e) = result {
                warn!(?e, "audio reset step failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn prepare(&mut self, platform: &dyn AudioPlatform) -> Result<(), RouteError> {
        platform.set_audio_mode(PlatformAudioMode::InCommunication)?;
        platform.set_microphone_mute(false)?;

        match platform.request_audio_focus()? {
            FocusRequest::Granted => Ok(()),
            FocusRequest::Failed => {
                warn!("audio focus request failed");
                Err(RouteError::FocusDenied)
            }
        }
    }

    fn apply(
        &mut self,
        platform: &dyn AudioPlatform,
        endpoint: EndpointKind,
    ) -> Result<(), RouteError> {
        debug!(device = %endpoint, "switching audio route directly");
        Self::set_bluetooth(platform, endpoint == EndpointKind::Bluetooth)?;
        platform.set_speakerphone_on(endpoint == EndpointKind::Speaker)?;
        Ok(())
    }
}
