//! Unix domain socket server for IPC
//!
//! Exposes the controller operations to the application layer, accepts
//! platform notifications from the bridge, and pushes route events to
//! subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::controller::ControllerHandle;
use crate::events::{PlatformEvent, RouteEvent};
use crate::platform::RecordingPlatform;

use super::protocol::{Notification, Request, Response};

/// Frames above this size close the connection
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Everything a client handler needs
struct Shared {
    controller: ControllerHandle,
    platform: RecordingPlatform,
    event_tx: broadcast::Sender<RouteEvent>,
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind the socket, replacing a stale one
    pub fn new(
        socket_path: &Path,
        controller: ControllerHandle,
        platform: RecordingPlatform,
        event_tx: broadcast::Sender<RouteEvent>,
    ) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context("failed to create socket directory")?;
        }

        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path)
            .context("failed to bind Unix socket")?;

        // Owner-only access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Arc::new(Shared {
                controller,
                platform,
                event_tx,
            }),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection.
    ///
    /// Responses and notifications share one writer task so frames never
    /// interleave.
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(64);
        let writer_task = tokio::spawn(Self::write_frames(writer, out_rx));
        let mut forwarder: Option<JoinHandle<()>> = None;

        let result: Result<()> = async {
            while let Some(msg_buf) = Self::read_frame(&mut reader).await? {
                let response = match serde_json::from_slice::<Request>(&msg_buf) {
                    Ok(request) => {
                        debug!(?request, "received request");
                        let subscribe = matches!(request, Request::Subscribe);
                        let response = Self::process_request(request, &shared).await;
                        if subscribe && forwarder.is_none() {
                            debug!("client subscribed to notifications");
                            forwarder = Some(Self::forward_events(
                                shared.event_tx.subscribe(),
                                out_tx.clone(),
                            ));
                        }
                        response
                    }
                    Err(e) => {
                        warn!(?e, "failed to parse request");
                        Response::Error {
                            code: "bad_request".to_string(),
                            message: e.to_string(),
                        }
                    }
                };

                if out_tx.send(encode(&response)?).await.is_err() {
                    break;
                }
            }
            debug!("client disconnected");
            Ok(())
        }
        .await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        drop(out_tx);
        let _ = writer_task.await;

        result
    }

    /// Read one length-prefixed frame; `None` on clean disconnect
    async fn read_frame(reader: &mut OwnedReadHalf) -> Result<Option<Vec<u8>>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            warn!(len, "message too large, disconnecting");
            return Ok(None);
        }

        let mut msg_buf = vec![0u8; len];
        reader.read_exact(&mut msg_buf).await?;
        Ok(Some(msg_buf))
    }

    async fn write_frames(mut writer: OwnedWriteHalf, mut out_rx: mpsc::Receiver<Vec<u8>>) {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                debug!(?e, "client write failed");
                break;
            }
        }
    }

    /// Push route events to a subscribed client until it goes away
    fn forward_events(
        mut event_rx: broadcast::Receiver<RouteEvent>,
        out_tx: mpsc::Sender<Vec<u8>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = match event_rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged behind route events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let frame = match encode(&Notification::RouteEvent(event)) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(?e, "failed to encode notification");
                        continue;
                    }
                };
                if out_tx.send(frame).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Process a request and return a response
    async fn process_request(request: Request, shared: &Shared) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetConstants => Response::Constants(ControllerHandle::constants()),

            Request::GetAudioDevices => shared.controller.get_audio_devices().await.into(),

            Request::SetAudioDevice { device } => {
                shared.controller.set_audio_device(device);
                Response::Accepted
            }

            Request::SetMode { mode } => match shared.controller.set_mode(mode).await {
                Ok(()) => Response::ModeSet { mode },
                Err(e) => Response::Error {
                    code: e.code().to_string(),
                    message: e.to_string(),
                },
            },

            Request::PlatformEvent { event } => {
                shared.controller.post(event);
                Response::Accepted
            }

            Request::ReportDevices { devices } => {
                shared.platform.set_devices(devices);
                shared.controller.post(PlatformEvent::DevicesChanged);
                Response::Accepted
            }

            Request::Subscribe => Response::Subscribed,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Length-prefixed JSON frame
fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let mut frame = Vec::with_capacity(4 + msg_bytes.len());
    frame.extend_from_slice(&(msg_bytes.len() as u32).to_le_bytes());
    frame.extend_from_slice(&msg_bytes);
    Ok(frame)
}
