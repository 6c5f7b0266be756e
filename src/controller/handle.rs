//! Handle to the controller worker
//!
//! The controller runs on a dedicated thread. Application calls and
//! platform callbacks from any thread are queued onto it through a
//! [`ControllerHandle`] and processed strictly in arrival order.

use std::sync::OnceLock;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::machine::{Command, DeviceSnapshot, ModeController};
use super::mode::{AudioMode, ModeConstants};
use crate::error::{AudioModeError, ControllerError};
use crate::events::PlatformEvent;

static GLOBAL: OnceLock<ControllerHandle> = OnceLock::new();

/// Cloneable sender side of the controller queue
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    command_tx: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    /// Start `controller` on its own thread.
    ///
    /// The worker stops once every handle has been dropped.
    pub fn spawn(
        controller: ModeController,
    ) -> Result<(Self, thread::JoinHandle<()>), ControllerError> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let join = thread::Builder::new()
            .name("audio-controller".to_string())
            .spawn(move || controller.run(command_rx))
            .map_err(|e| ControllerError::ThreadSpawn(e.to_string()))?;

        Ok((Self { command_tx }, join))
    }

    /// Mode values exported to clients
    pub fn constants() -> ModeConstants {
        ModeConstants::default()
    }

    /// Available devices and the current selection
    pub async fn get_audio_devices(&self) -> DeviceSnapshot {
        let (reply, rx) = oneshot::channel();
        if !self.send(Command::GetDevices { reply }) {
            return DeviceSnapshot::default();
        }
        rx.await.unwrap_or_else(|_| {
            warn!("audio controller dropped a device query");
            DeviceSnapshot::default()
        })
    }

    /// Select a device by category name; invalid names are ignored
    pub fn set_audio_device(&self, device: impl Into<String>) {
        let device = device.into();
        debug!(%device, "queueing user device selection");
        self.send(Command::SetUserDevice { device });
    }

    /// Switch the conversation mode.
    ///
    /// Unknown mode values are rejected before anything is queued.
    pub async fn set_mode(&self, mode: i64) -> Result<(), AudioModeError> {
        let mode = AudioMode::try_from(mode).map_err(|e| {
            warn!(mode, "rejecting invalid audio mode");
            e
        })?;

        let (reply, rx) = oneshot::channel();
        if !self.send(Command::SetMode { mode, reply }) {
            return Err(AudioModeError::ControllerGone);
        }
        rx.await.map_err(|_| AudioModeError::ControllerGone)?
    }

    /// Queue a platform notification. Never blocks; safe from any thread.
    pub fn post(&self, event: PlatformEvent) {
        self.send(Command::Platform(event));
    }

    fn send(&self, command: Command) -> bool {
        if self.command_tx.send(command).is_err() {
            error!("audio controller is not running");
            return false;
        }
        true
    }
}

/// Register the process-wide controller.
///
/// There is one physical audio subsystem, so there is one controller. The
/// daemon installs it once at startup; it lives until the process exits.
pub fn install(handle: ControllerHandle) -> Result<(), ControllerError> {
    GLOBAL
        .set(handle)
        .map_err(|_| ControllerError::AlreadyInstalled)?;
    info!("global audio controller installed");
    Ok(())
}

/// The controller registered with [`install`], if any
pub fn global() -> Option<&'static ControllerHandle> {
    GLOBAL.get()
}
