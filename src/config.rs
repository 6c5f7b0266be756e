//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::device::Detection;
use crate::routing::Capability;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Which route strategy the platform supports
    pub capability: Capability,

    /// How devices are detected under direct routing
    pub detection: Detection,

    /// Whether the device has telephony hardware (earpiece)
    pub telephony: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Self::from_lookup(&home, |key| std::env::var(key).ok())
    }

    fn from_lookup(home: &str, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("audio-routed");

        let socket_path = data_dir.join("daemon.sock");

        let capability = match var("AUDIO_ROUTED_CAPABILITY").as_deref() {
            None | Some("direct") => Capability::Direct,
            Some("call-routing") => Capability::CallRouting,
            Some(other) => bail!(
                "invalid AUDIO_ROUTED_CAPABILITY {other:?}, expected call-routing or direct"
            ),
        };

        let detection = match var("AUDIO_ROUTED_DETECTION").as_deref() {
            None | Some("enumerate") => Detection::Enumeration,
            Some("legacy") => Detection::Legacy,
            Some(other) => bail!(
                "invalid AUDIO_ROUTED_DETECTION {other:?}, expected enumerate or legacy"
            ),
        };

        let telephony = match var("AUDIO_ROUTED_TELEPHONY") {
            None => true,
            Some(value) => value
                .parse::<bool>()
                .with_context(|| format!("invalid AUDIO_ROUTED_TELEPHONY {value:?}"))?,
        };

        Ok(Self {
            socket_path,
            data_dir,
            capability,
            detection,
            telephony,
        })
    }
}
