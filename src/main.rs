//! audio-routed: audio device routing daemon for real-time calls
//!
//! Decides which single endpoint (earpiece, speaker, wired headset,
//! Bluetooth) carries call audio for the current conversation mode, and
//! re-decides whenever devices, the mode, or the user's choice change.
//!
//! Components:
//! - Device inventory fed by platform events
//! - Pure endpoint selection
//! - Route application through one of two platform strategies
//! - A mode controller that serializes all of the above on one worker
//! - IPC server for the application layer and the platform bridge

mod config;
mod controller;
mod device;
mod error;
mod events;
mod ipc;
mod lifecycle;
mod platform;
mod routing;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::controller::{AudioMode, ControllerHandle, ModeController};
use crate::events::RouteEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::platform::RecordingPlatform;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "audio-routed starting"
    );

    let config = Config::load()?;
    info!(
        ?config.socket_path,
        ?config.data_dir,
        capability = %config.capability,
        detection = %config.detection,
        telephony = config.telephony,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new()?;

    // Controller -> IPC subscribers and the event log below
    let (event_tx, mut event_rx) = broadcast::channel::<RouteEvent>(64);

    // Devices are reported by the platform bridge over IPC
    let platform = RecordingPlatform::new(config.telephony);

    let mode_controller = ModeController::new(
        Box::new(platform.clone()),
        config.capability,
        config.detection,
        event_tx.clone(),
    );
    let (handle, _worker) = ControllerHandle::spawn(mode_controller)?;
    controller::install(handle.clone())?;

    let server = Server::new(&config.socket_path, handle, platform, event_tx)?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => info!(%event, "route event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "route event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("route event log exited");
        }

        signal = shutdown.wait() => {
            info!(signal, "shutdown signal received");
        }
    }

    info!("shutting down...");

    // Leave the platform in its default state if a call was active
    if let Some(global) = controller::global() {
        if let Err(e) = global.set_mode(AudioMode::DEFAULT).await {
            warn!(?e, "failed to reset audio mode on shutdown");
        }
    }
    server.shutdown().await;

    info!("audio-routed stopped");

    Ok(())
}
