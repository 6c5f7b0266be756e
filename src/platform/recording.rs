//! In-memory platform backend
//!
//! Holds the device list reported by the host, logs every primitive and
//! keeps a journal of the calls made. The daemon uses it as its backend
//! when the host bridge reports devices over IPC; tests use it as a fake.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{AudioPlatform, DeviceType, FocusRequest, PlatformAudioMode};
use crate::error::PlatformError;

/// One primitive invoked on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    SetAudioMode(PlatformAudioMode),
    SetMicrophoneMute(bool),
    SetSpeakerphoneOn(bool),
    StartBluetoothSco,
    StopBluetoothSco,
    SetBluetoothScoOn(bool),
    RequestAudioFocus,
    AbandonAudioFocus,
    SetCallAudioRoute(u32),
}

impl PlatformCall {
    fn name(&self) -> &'static str {
        match self {
            PlatformCall::SetAudioMode(_) => "set_audio_mode",
            PlatformCall::SetMicrophoneMute(_) => "set_microphone_mute",
            PlatformCall::SetSpeakerphoneOn(_) => "set_speakerphone_on",
            PlatformCall::StartBluetoothSco => "start_bluetooth_sco",
            PlatformCall::StopBluetoothSco => "stop_bluetooth_sco",
            PlatformCall::SetBluetoothScoOn(_) => "set_bluetooth_sco_on",
            PlatformCall::RequestAudioFocus => "request_audio_focus",
            PlatformCall::AbandonAudioFocus => "abandon_audio_focus",
            PlatformCall::SetCallAudioRoute(_) => "set_call_audio_route",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    devices: Vec<DeviceType>,
    telephony: bool,
    deny_focus: bool,
    fail_calls: bool,
    fail_on: Option<PlatformCall>,
    journal: Vec<PlatformCall>,
}

/// Cloneable handle; clones share the same device list and journal
#[derive(Debug, Clone, Default)]
pub struct RecordingPlatform {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingPlatform {
    pub fn new(telephony: bool) -> Self {
        let platform = Self::default();
        platform.lock().telephony = telephony;
        platform
    }

    pub fn with_devices(telephony: bool, devices: Vec<DeviceType>) -> Self {
        let platform = Self::new(telephony);
        platform.set_devices(devices);
        platform
    }

    /// Replace the attached device list
    pub fn set_devices(&self, devices: Vec<DeviceType>) {
        debug!(?devices, "platform device list replaced");
        self.lock().devices = devices;
    }

    /// Make subsequent focus requests fail
    pub fn deny_focus(&self, deny: bool) {
        self.lock().deny_focus = deny;
    }

    /// Make every subsequent primitive return an error
    pub fn fail_calls(&self, fail: bool) {
        self.lock().fail_calls = fail;
    }

    /// Make one specific primitive return an error
    pub fn fail_on(&self, call: PlatformCall) {
        self.lock().fail_on = Some(call);
    }

    pub fn journal(&self) -> Vec<PlatformCall> {
        self.lock().journal.clone()
    }

    /// Drain the journal
    pub fn take_journal(&self) -> Vec<PlatformCall> {
        std::mem::take(&mut self.lock().journal)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: PlatformCall) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        if inner.fail_calls || inner.fail_on.as_ref() == Some(&call) {
            return Err(PlatformError::CallFailed {
                call: call.name(),
                reason: "injected failure".to_string(),
            });
        }
        debug!(?call, "platform call");
        inner.journal.push(call);
        Ok(())
    }
}

impl AudioPlatform for RecordingPlatform {
    fn list_devices(&self) -> Result<Vec<DeviceType>, PlatformError> {
        let inner = self.lock();
        if inner.fail_calls {
            return Err(PlatformError::Unavailable("device enumeration failed".to_string()));
        }
        Ok(inner.devices.clone())
    }

    fn has_telephony(&self) -> bool {
        self.lock().telephony
    }

    fn set_audio_mode(&self, mode: PlatformAudioMode) -> Result<(), PlatformError> {
        self.record(PlatformCall::SetAudioMode(mode))
    }

    fn set_microphone_mute(&self, muted: bool) -> Result<(), PlatformError> {
        self.record(PlatformCall::SetMicrophoneMute(muted))
    }

    fn set_speakerphone_on(&self, on: bool) -> Result<(), PlatformError> {
        self.record(PlatformCall::SetSpeakerphoneOn(on))
    }

    fn start_bluetooth_sco(&self) -> Result<(), PlatformError> {
        self.record(PlatformCall::StartBluetoothSco)
    }

    fn stop_bluetooth_sco(&self) -> Result<(), PlatformError> {
        self.record(PlatformCall::StopBluetoothSco)
    }

    fn set_bluetooth_sco_on(&self, on: bool) -> Result<(), PlatformError> {
        self.record(PlatformCall::SetBluetoothScoOn(on))
    }

    fn request_audio_focus(&self) -> Result<FocusRequest, PlatformError> {
        self.record(PlatformCall::RequestAudioFocus)?;
        if self.lock().deny_focus {
            Ok(FocusRequest::Failed)
        } else {
            Ok(FocusRequest::Granted)
        }
    }

    fn abandon_audio_focus(&self) -> Result<(), PlatformError> {
        self.record(PlatformCall::AbandonAudioFocus)
    }

    fn set_call_audio_route(&self, route: u32) -> Result<(), PlatformError> {
        self.record(PlatformCall::SetCallAudioRoute(route))
    }
}
