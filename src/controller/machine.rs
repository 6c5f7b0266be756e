//! Mode controller
//!
//! Owns the conversation mode, the device inventory, the user override and
//! the last applied endpoint. Every method here runs on the controller
//! worker; nothing else touches this state.

use std::panic::{self, AssertUnwindSafe};

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::mode::AudioMode;
use crate::device::{Detection, DeviceInventory, EndpointKind};
use crate::error::{AudioModeError, RouteError};
use crate::events::{FocusChange, PlatformEvent, RouteEvent};
use crate::platform::AudioPlatform;
use crate::routing::{self, Capability, Outcome, RouteStrategy};

/// Point-in-time view returned by `get_audio_devices`
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeviceSnapshot {
    pub devices: Vec<EndpointKind>,
    pub selected: Option<EndpointKind>,
}

/// Audio focus bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusState {
    /// Focus was granted and not given up since
    pub held: bool,
    /// Focus was taken away; the route is restored on regain
    pub lost: bool,
}

/// Units of work queued onto the controller worker
#[derive(Debug)]
pub enum Command {
    GetDevices {
        reply: oneshot::Sender<DeviceSnapshot>,
    },
    SetUserDevice {
        device: String,
    },
    SetMode {
        mode: AudioMode,
        reply: oneshot::Sender<Result<(), AudioModeError>>,
    },
    Platform(PlatformEvent),
}

/// The routing state machine
pub struct ModeController {
    /// `None` until the first successful `set_mode`
    mode: Option<AudioMode>,
    inventory: DeviceInventory,
    detection: Detection,
    user_override: Option<EndpointKind>,
    selected: Option<EndpointKind>,
    focus: FocusState,
    platform: Box<dyn AudioPlatform>,
    strategy: Box<dyn RouteStrategy>,
    event_tx: broadcast::Sender<RouteEvent>,
}

impl ModeController {
    /// Create a controller.
    ///
    /// The call-routing capability always reports devices through the
    /// capability mask, so `detection` only matters for direct routing.
    pub fn new(
        platform: Box<dyn AudioPlatform>,
        capability: Capability,
        detection: Detection,
        event_tx: broadcast::Sender<RouteEvent>,
    ) -> Self {
        let detection = match capability {
            Capability::CallRouting => Detection::CapabilityMask,
            Capability::Direct if detection == Detection::CapabilityMask => {
                warn!("capability mask detection needs call routing, falling back to enumeration");
                Detection::Enumeration
            }
            Capability::Direct => detection,
        };

        let inventory = match detection {
            Detection::Legacy => DeviceInventory::seeded_legacy(platform.has_telephony()),
            _ => DeviceInventory::new(),
        };

        info!(
            %capability,
            %detection,
            available = %inventory.available(),
            "audio controller created"
        );

        Self {
            mode: None,
            inventory,
            detection,
            user_override: None,
            selected: None,
            focus: FocusState::default(),
            platform,
            strategy: routing::strategy_for(capability),
            event_tx,
        }
    }

    pub fn mode(&self) -> Option<AudioMode> {
        self.mode
    }

    pub fn selected(&self) -> Option<EndpointKind> {
        self.selected
    }

    pub fn user_override(&self) -> Option<EndpointKind> {
        self.user_override
    }

    pub fn focus(&self) -> FocusState {
        self.focus
    }

    /// Run the worker loop until every handle is dropped
    pub fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<Command>) {
        info!("audio controller started");

        // Initial detection on platforms that can enumerate
        if self.detection == Detection::Enumeration {
            self.contain("initial device scan", Self::rescan);
        }

        while let Some(command) = command_rx.blocking_recv() {
            self.contain("command", |controller| controller.handle(command));
        }

        info!("audio controller stopped");
    }

    /// Run `f`, surviving a panic raised by the platform backend
    fn contain(&mut self, context: &'static str, f: impl FnOnce(&mut Self)) {
        if panic::catch_unwind(AssertUnwindSafe(|| f(self))).is_err() {
            error!(context, "audio controller recovered from a panic");
        }
    }

    /// Process one queued unit of work
    pub fn handle(&mut self, command: Command) {
        match command {
            Command::GetDevices { reply } => {
                let _ = reply.send(self.devices());
            }
            Command::SetUserDevice { device } => self.set_user_device(&device),
            Command::SetMode { mode, reply } => {
                let result = panic::catch_unwind(AssertUnwindSafe(|| self.set_mode(mode)))
                    .unwrap_or_else(|_| {
                        error!(%mode, "audio route update panicked");
                        Err(AudioModeError::RouteUpdateFailed(mode.code()))
                    });
                if reply.send(result).is_err() {
                    debug!(%mode, "set_mode caller went away before the result");
                }
            }
            Command::Platform(event) => self.handle_platform_event(event),
        }
    }

    /// Snapshot of available devices and the current selection
    pub fn devices(&self) -> DeviceSnapshot {
        let video = self.mode == Some(AudioMode::VideoCall);
        let devices = self
            .inventory
            .available()
            .iter()
            // Never a valid destination for video
            .filter(|device| !(video && *device == EndpointKind::Earpiece))
            .collect();

        DeviceSnapshot {
            devices,
            selected: self.selected,
        }
    }

    /// Switch to `mode`, routing audio as needed.
    ///
    /// On failure the previous mode and selection are kept.
    pub fn set_mode(&mut self, mode: AudioMode) -> Result<(), AudioModeError> {
        match self.update_route(mode, false) {
            Ok(()) => {
                let previous = self.mode.replace(mode);
                if previous != Some(mode) {
                    info!(from = ?previous, to = %mode, "audio mode changed");
                    self.emit(RouteEvent::ModeChanged { mode, previous });
                }
                Ok(())
            }
            Err(RouteError::FocusDenied) => {
                warn!(%mode, "audio focus denied, mode unchanged");
                Err(AudioModeError::FocusDenied(mode.code()))
            }
            Err(RouteError::Platform(e)) => {
                error!(?e, %mode, "failed to update audio route");
                Err(AudioModeError::RouteUpdateFailed(mode.code()))
            }
        }
    }

    /// Record a user device choice.
    ///
    /// Unknown or unavailable devices clear any earlier choice. The route
    /// is only updated while a call mode is active.
    pub fn set_user_device(&mut self, name: &str) {
        let device = match name.parse::<EndpointKind>() {
            Ok(device) if self.inventory.available().contains(device) => device,
            _ => {
                info!(device = name, "audio device not available");
                self.user_override = None;
                return;
            }
        };

        info!(%device, "user selected device");
        self.user_override = Some(device);
        self.refresh_route(false);
    }

    /// Feed a platform notification through the inventory and selection
    pub fn handle_platform_event(&mut self, event: PlatformEvent) {
        debug!(?event, "platform event");

        match event {
            PlatformEvent::DevicesChanged => {
                if self.accepts(Detection::Enumeration, &event) {
                    self.rescan();
                }
            }
            PlatformEvent::HeadsetPlug { present } => {
                if self.accepts(Detection::Legacy, &event) {
                    let changed = self.inventory.apply_legacy_headset_state(present);
                    self.after_inventory_update(changed);
                }
            }
            PlatformEvent::BluetoothHeadset { present } => {
                if self.accepts(Detection::Legacy, &event) {
                    let changed = self.inventory.apply_legacy_bluetooth_state(present);
                    self.after_inventory_update(changed);
                }
            }
            PlatformEvent::CallAudioState {
                route,
                supported_route_mask,
            } => {
                if self.accepts(Detection::CapabilityMask, &event) {
                    self.apply_call_audio_state(route, supported_route_mask);
                }
            }
            PlatformEvent::AudioFocus { change } => self.handle_focus_change(change),
        }
    }

    fn accepts(&self, detection: Detection, event: &PlatformEvent) -> bool {
        if self.detection != detection {
            debug!(
                ?event,
                detection = %self.detection,
                "ignoring event for another detection mode"
            );
            return false;
        }
        true
    }

    fn rescan(&mut self) {
        match self.platform.list_devices() {
            Ok(devices) => {
                let changed = self.inventory.recompute(&devices);
                self.after_inventory_update(changed);
            }
            Err(e) => warn!(?e, "failed to enumerate audio devices"),
        }
    }

    fn after_inventory_update(&mut self, changed: bool) {
        if changed {
            info!(available = %self.inventory.available(), "available audio devices");
            // A different device set invalidates the user's choice
            self.user_override = None;
            self.emit_devices();
        }
        self.refresh_route(false);
    }

    fn apply_call_audio_state(&mut self, route: u32, supported_route_mask: u32) {
        let devices_changed = self.inventory.apply_capability_mask(supported_route_mask);
        if devices_changed {
            info!(available = %self.inventory.available(), "available audio devices");
            self.emit_devices();
        }

        // With nothing selected yet the platform default is the earpiece
        let ours = self
            .selected
            .unwrap_or(EndpointKind::Earpiece)
            .route_bit();
        let route_changed = ours != route;

        if route_changed || devices_changed {
            // The platform may have moved audio on its own; the previous
            // choice no longer describes reality.
            // TODO: keep the user override when the route change does not
            // touch the overridden endpoint.
            debug!(route, ours, devices_changed, "call audio state diverged");
            self.user_override = None;
            self.selected = None;
            self.refresh_route(false);
        }
    }

    fn handle_focus_change(&mut self, change: FocusChange) {
        match change {
            FocusChange::Gain => {
                info!("audio focus gained");
                self.focus.held = true;
                // Whoever took focus may have changed the route
                if self.focus.lost && self.refresh_route(true) {
                    self.focus.lost = false;
                    self.emit(RouteEvent::FocusRestored);
                }
            }
            FocusChange::Loss | FocusChange::LossTransient | FocusChange::LossTransientCanDuck => {
                info!(?change, "audio focus lost");
                self.focus.held = false;
                self.focus.lost = true;
                self.emit(RouteEvent::FocusLost);
            }
        }
    }

    /// Re-run routing for the current call mode, if any.
    ///
    /// Returns whether a call route is in place afterwards.
    fn refresh_route(&mut self, force: bool) -> bool {
        let Some(mode) = self.mode.filter(AudioMode::is_call) else {
            return false;
        };
        match self.update_route(mode, force) {
            Ok(()) => true,
            Err(e) => {
                warn!(?e, %mode, "audio route update failed");
                false
            }
        }
    }

    /// Compute and apply the route for `mode`.
    ///
    /// `force` re-applies the endpoint even if it is already selected.
    fn update_route(&mut self, mode: AudioMode, force: bool) -> Result<(), RouteError> {
        debug!(%mode, force, "updating audio route");

        if !mode.is_call() {
            self.focus = FocusState::default();
            if let Err(e) = self.strategy.reset(self.platform.as_ref()) {
                warn!(?e, "failed to restore default audio routing");
            }
            self.selected = None;
            self.user_override = None;
            return Ok(());
        }

        self.strategy.prepare(self.platform.as_ref())?;
        if self.strategy.capability() == Capability::Direct {
            self.focus.held = true;
        }

        let previous = if force { None } else { self.selected };
        let decision = routing::select(
            mode,
            self.inventory.available(),
            self.user_override,
            previous,
        );

        if decision.stale_override {
            debug!(device = ?self.user_override, "dropping stale user selection");
            self.user_override = None;
        }

        if decision.outcome == Outcome::Unchanged {
            debug!(device = %decision.endpoint, "audio route unchanged");
            return Ok(());
        }

        self.strategy
            .apply(self.platform.as_ref(), decision.endpoint)?;
        self.selected = Some(decision.endpoint);

        info!(device = %decision.endpoint, %mode, "selected audio device");
        self.emit(RouteEvent::RouteApplied {
            device: decision.endpoint,
        });

        Ok(())
    }

    fn emit_devices(&self) {
        let devices = self.inventory.available().iter().collect();
        self.emit(RouteEvent::DevicesChanged { devices });
    }

    fn emit(&self, event: RouteEvent) {
        debug!(%event, "emitting route event");
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{DeviceType, PlatformAudioMode, PlatformCall, RecordingPlatform};

    fn create_controller(
        capability: Capability,
        detection: Detection,
        devices: Vec<DeviceType>,
    ) -> (ModeController, RecordingPlatform, broadcast::Receiver<RouteEvent>) {
        let platform = RecordingPlatform::with_devices(true, devices);
        let (tx, rx) = broadcast::channel(64);
        let mut controller =
            ModeController::new(Box::new(platform.clone()), capability, detection, tx);
        if controller.detection == Detection::Enumeration {
            controller.rescan();
        }
        platform.take_journal();
        (controller, platform, rx)
    }

    fn direct(
        devices: Vec<DeviceType>,
    ) -> (ModeController, RecordingPlatform, broadcast::Receiver<RouteEvent>) {
        create_controller(Capability::Direct, Detection::Enumeration, devices)
    }

    const ROUTE_EARPIECE: u32 = 0x1;
    const ROUTE_BLUETOOTH: u32 = 0x2;
    const ROUTE_SPEAKER: u32 = 0x8;

    fn phone() -> Vec<DeviceType> {
        vec![DeviceType::BuiltinEarpiece, DeviceType::BuiltinSpeaker]
    }

    fn drain(rx: &mut broadcast::Receiver<RouteEvent>) -> Vec<RouteEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_initial_state() {
        let (controller, _, _) = direct(phone());
        assert_eq!(controller.mode(), None);
        assert_eq!(controller.selected(), None);
        assert_eq!(controller.user_override(), None);
        assert_eq!(controller.focus(), FocusState::default());
        assert_eq!(
            controller.devices().devices,
            vec![EndpointKind::Earpiece, EndpointKind::Speaker]
        );
    }

    #[test]
    fn test_audio_call_uses_earpiece() {
        let (mut controller, platform, mut rx) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();

        assert_eq!(controller.mode(), Some(AudioMode::AudioCall));
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
        assert!(controller.focus().held);
        assert_eq!(
            platform.journal(),
            vec![
                PlatformCall::SetAudioMode(PlatformAudioMode::InCommunication),
                PlatformCall::SetMicrophoneMute(false),
                PlatformCall::RequestAudioFocus,
                PlatformCall::SetBluetoothScoOn(false),
                PlatformCall::StopBluetoothSco,
                PlatformCall::SetSpeakerphoneOn(false),
            ]
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                RouteEvent::RouteApplied {
                    device: EndpointKind::Earpiece
                },
                RouteEvent::ModeChanged {
                    mode: AudioMode::AudioCall,
                    previous: None
                },
            ]
        );
    }

    #[test]
    fn test_repeated_mode_is_idempotent() {
        let (mut controller, platform, _) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();
        platform.take_journal();

        controller.set_mode(AudioMode::AudioCall).unwrap();
        let journal = platform.journal();
        assert!(!journal.contains(&PlatformCall::SetSpeakerphoneOn(false)));
        assert!(!journal.contains(&PlatformCall::StopBluetoothSco));
    }

    #[test]
    fn test_video_call_filters_earpiece() {
        let (mut controller, _, _) = direct(phone());
        controller.set_mode(AudioMode::VideoCall).unwrap();

        let snapshot = controller.devices();
        assert_eq!(snapshot.devices, vec![EndpointKind::Speaker]);
        assert_eq!(snapshot.selected, Some(EndpointKind::Speaker));
    }

    #[test]
    fn test_idle_resets_selection() {
        let (mut controller, platform, _) = direct(phone());
        controller.set_mode(AudioMode::VideoCall).unwrap();
        controller.set_user_device("EARPIECE");
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));

        platform.take_journal();
        controller.set_mode(AudioMode::Idle).unwrap();
        assert_eq!(controller.mode(), Some(AudioMode::Idle));
        assert_eq!(controller.selected(), None);
        assert_eq!(controller.user_override(), None);
        assert_eq!(controller.devices().selected, None);
        assert!(platform.journal().contains(&PlatformCall::AbandonAudioFocus));
        assert!(platform
            .journal()
            .contains(&PlatformCall::SetAudioMode(PlatformAudioMode::Normal)));

        // Full selection runs again, no stickiness from the old override
        platform.take_journal();
        controller.set_mode(AudioMode::AudioCall).unwrap();
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
        assert!(platform.journal().contains(&PlatformCall::SetSpeakerphoneOn(false)));
    }

    #[test]
    fn test_idle_succeeds_even_if_platform_fails() {
        let (mut controller, platform, _) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();
        platform.fail_calls(true);
        assert_eq!(controller.set_mode(AudioMode::Idle), Ok(()));
        assert_eq!(controller.mode(), Some(AudioMode::Idle));
    }

    #[test]
    fn test_focus_denied_keeps_previous_state() {
        let (mut controller, platform, _) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();

        platform.deny_focus(true);
        let result = controller.set_mode(AudioMode::VideoCall);
        assert_eq!(result, Err(AudioModeError::FocusDenied(2)));
        assert_eq!(controller.mode(), Some(AudioMode::AudioCall));
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
    }

    #[test]
    fn test_platform_failure_is_generic_error() {
        let (mut controller, platform, _) = direct(phone());
        platform.fail_calls(true);
        let err = controller.set_mode(AudioMode::AudioCall).unwrap_err();
        assert_eq!(err.to_string(), "Failed to set audio mode to 1");
        assert_eq!(controller.mode(), None);
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn test_bluetooth_removal_recomputes() {
        let (mut controller, platform, _) = direct(vec![
            DeviceType::BluetoothSco,
            DeviceType::BuiltinSpeaker,
        ]);
        controller.set_mode(AudioMode::AudioCall).unwrap();
        assert_eq!(controller.selected(), Some(EndpointKind::Bluetooth));

        platform.set_devices(vec![DeviceType::BuiltinSpeaker]);
        controller.handle_platform_event(PlatformEvent::DevicesChanged);
        assert_eq!(controller.selected(), Some(EndpointKind::Speaker));

        platform.set_devices(vec![
            DeviceType::BluetoothSco,
            DeviceType::BuiltinEarpiece,
            DeviceType::BuiltinSpeaker,
        ]);
        controller.handle_platform_event(PlatformEvent::DevicesChanged);
        assert_eq!(controller.selected(), Some(EndpointKind::Bluetooth));

        platform.set_devices(phone());
        controller.handle_platform_event(PlatformEvent::DevicesChanged);
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
    }

    #[test]
    fn test_user_device_before_mode_is_deferred() {
        let (mut controller, platform, _) = direct(phone());
        controller.set_user_device("SPEAKER");
        assert_eq!(controller.user_override(), Some(EndpointKind::Speaker));
        assert_eq!(controller.selected(), None);
        assert!(platform.journal().is_empty());

        controller.set_mode(AudioMode::AudioCall).unwrap();
        assert_eq!(controller.selected(), Some(EndpointKind::Speaker));
    }

    #[test]
    fn test_unavailable_user_device_clears_override() {
        let (mut controller, _, _) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();
        controller.set_user_device("SPEAKER");
        assert_eq!(controller.selected(), Some(EndpointKind::Speaker));

        controller.set_user_device("BLUETOOTH");
        assert_eq!(controller.user_override(), None);
        controller.set_user_device("SPEAKER");
        controller.set_user_device("TOASTER");
        assert_eq!(controller.user_override(), None);
        // Selection stays until something triggers an update
        assert_eq!(controller.selected(), Some(EndpointKind::Speaker));
    }

    #[test]
    fn test_vanished_override_falls_back() {
        let (mut controller, platform, _) = direct(vec![
            DeviceType::WiredHeadset,
            DeviceType::BuiltinEarpiece,
            DeviceType::BuiltinSpeaker,
        ]);
        controller.set_mode(AudioMode::AudioCall).unwrap();
        controller.set_user_device("HEADPHONES");
        controller.set_user_device("SPEAKER");
        assert_eq!(controller.selected(), Some(EndpointKind::Speaker));

        platform.set_devices(vec![DeviceType::WiredHeadset, DeviceType::BuiltinEarpiece]);
        controller.handle_platform_event(PlatformEvent::DevicesChanged);
        assert_eq!(controller.user_override(), None);
        assert_eq!(controller.selected(), Some(EndpointKind::WiredHeadset));
    }

    #[test]
    fn test_focus_loss_and_regain_reapplies_route() {
        let (mut controller, platform, mut rx) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();
        drain(&mut rx);
        platform.take_journal();

        controller.handle_platform_event(PlatformEvent::AudioFocus {
            change: FocusChange::LossTransient,
        });
        assert!(controller.focus().lost);
        assert!(platform.journal().is_empty());

        controller.handle_platform_event(PlatformEvent::AudioFocus {
            change: FocusChange::Gain,
        });
        assert!(!controller.focus().lost);
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
        let journal = platform.journal();
        assert!(journal.contains(&PlatformCall::RequestAudioFocus));
        assert!(journal.contains(&PlatformCall::SetSpeakerphoneOn(false)));
        assert_eq!(
            drain(&mut rx),
            vec![
                RouteEvent::FocusLost,
                RouteEvent::RouteApplied {
                    device: EndpointKind::Earpiece
                },
                RouteEvent::FocusRestored,
            ]
        );
    }

    #[test]
    fn test_failed_focus_regain_is_not_reported_as_restored() {
        let (mut controller, platform, mut rx) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();
        drain(&mut rx);

        controller.handle_platform_event(PlatformEvent::AudioFocus {
            change: FocusChange::Loss,
        });
        platform.deny_focus(true);
        controller.handle_platform_event(PlatformEvent::AudioFocus {
            change: FocusChange::Gain,
        });
        assert!(controller.focus().lost);
        assert_eq!(drain(&mut rx), vec![RouteEvent::FocusLost]);

        // The next regain that succeeds restores the route
        platform.deny_focus(false);
        controller.handle_platform_event(PlatformEvent::AudioFocus {
            change: FocusChange::Gain,
        });
        assert!(!controller.focus().lost);
        assert_eq!(
            drain(&mut rx),
            vec![
                RouteEvent::RouteApplied {
                    device: EndpointKind::Earpiece
                },
                RouteEvent::FocusRestored,
            ]
        );
    }

    #[test]
    fn test_idle_reset_runs_every_step_after_a_failure() {
        let (mut controller, platform, _) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();
        controller.set_user_device("SPEAKER");
        assert_eq!(controller.selected(), Some(EndpointKind::Speaker));

        platform.take_journal();
        platform.fail_on(PlatformCall::SetAudioMode(PlatformAudioMode::Normal));
        assert_eq!(controller.set_mode(AudioMode::Idle), Ok(()));
        assert_eq!(controller.selected(), None);
        assert_eq!(
            platform.journal(),
            vec![
                PlatformCall::AbandonAudioFocus,
                PlatformCall::SetSpeakerphoneOn(false),
                PlatformCall::SetBluetoothScoOn(false),
                PlatformCall::StopBluetoothSco,
            ]
        );
    }

    #[test]
    fn test_focus_gain_without_loss_is_noop() {
        let (mut controller, platform, _) = direct(phone());
        controller.set_mode(AudioMode::AudioCall).unwrap();
        platform.take_journal();

        controller.handle_platform_event(PlatformEvent::AudioFocus {
            change: FocusChange::Gain,
        });
        assert!(platform.journal().is_empty());
    }

    #[test]
    fn test_legacy_detection() {
        let (mut controller, platform, _) =
            create_controller(Capability::Direct, Detection::Legacy, Vec::new());
        assert_eq!(
            controller.devices().devices,
            vec![EndpointKind::Earpiece, EndpointKind::Speaker]
        );
        controller.set_mode(AudioMode::AudioCall).unwrap();

        controller.handle_platform_event(PlatformEvent::HeadsetPlug { present: true });
        assert_eq!(controller.selected(), Some(EndpointKind::WiredHeadset));

        controller.handle_platform_event(PlatformEvent::BluetoothHeadset { present: true });
        assert_eq!(controller.selected(), Some(EndpointKind::Bluetooth));

        controller.handle_platform_event(PlatformEvent::BluetoothHeadset { present: false });
        controller.handle_platform_event(PlatformEvent::HeadsetPlug { present: false });
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));

        // Rescans are not part of legacy detection
        platform.set_devices(vec![DeviceType::BluetoothSco]);
        controller.handle_platform_event(PlatformEvent::DevicesChanged);
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
    }

    #[test]
    fn test_call_routing_mask_updates() {
        let (mut controller, platform, _) =
            create_controller(Capability::CallRouting, Detection::Enumeration, Vec::new());

        controller.handle_platform_event(PlatformEvent::CallAudioState {
            route: ROUTE_EARPIECE,
            supported_route_mask: ROUTE_EARPIECE | ROUTE_SPEAKER | ROUTE_BLUETOOTH,
        });
        controller.set_mode(AudioMode::AudioCall).unwrap();
        assert_eq!(controller.selected(), Some(EndpointKind::Bluetooth));
        assert_eq!(
            platform.journal(),
            vec![PlatformCall::SetCallAudioRoute(ROUTE_BLUETOOTH)]
        );

        // Platform confirms our route: nothing to do
        platform.take_journal();
        controller.handle_platform_event(PlatformEvent::CallAudioState {
            route: ROUTE_BLUETOOTH,
            supported_route_mask: ROUTE_EARPIECE | ROUTE_SPEAKER | ROUTE_BLUETOOTH,
        });
        assert!(platform.journal().is_empty());

        // Bluetooth disappears from the mask
        controller.handle_platform_event(PlatformEvent::CallAudioState {
            route: ROUTE_EARPIECE,
            supported_route_mask: ROUTE_EARPIECE | ROUTE_SPEAKER,
        });
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
    }

    #[test]
    fn test_external_route_change_clears_override() {
        let (mut controller, platform, _) =
            create_controller(Capability::CallRouting, Detection::Enumeration, Vec::new());
        controller.handle_platform_event(PlatformEvent::CallAudioState {
            route: ROUTE_EARPIECE,
            supported_route_mask: ROUTE_EARPIECE | ROUTE_SPEAKER,
        });
        controller.set_mode(AudioMode::AudioCall).unwrap();
        controller.set_user_device("SPEAKER");
        assert_eq!(controller.selected(), Some(EndpointKind::Speaker));
        platform.take_journal();

        // Someone moved audio back to the earpiece outside the app
        controller.handle_platform_event(PlatformEvent::CallAudioState {
            route: ROUTE_EARPIECE,
            supported_route_mask: ROUTE_EARPIECE | ROUTE_SPEAKER,
        });
        assert_eq!(controller.user_override(), None);
        assert_eq!(controller.selected(), Some(EndpointKind::Earpiece));
        assert_eq!(
            platform.journal(),
            vec![PlatformCall::SetCallAudioRoute(ROUTE_EARPIECE)]
        );
    }

    #[test]
    fn test_call_routing_ignores_rescans() {
        let (mut controller, platform, _) =
            create_controller(Capability::CallRouting, Detection::Enumeration, phone());
        controller.handle_platform_event(PlatformEvent::DevicesChanged);
        assert!(controller.devices().devices.is_empty());
        assert!(platform.journal().is_empty());
    }

    #[test]
    fn test_device_change_while_idle_does_not_route() {
        let (mut controller, platform, mut rx) = direct(phone());
        controller.set_mode(AudioMode::Idle).unwrap();
        platform.take_journal();
        drain(&mut rx);

        platform.set_devices(vec![DeviceType::BluetoothSco, DeviceType::BuiltinSpeaker]);
        controller.handle_platform_event(PlatformEvent::DevicesChanged);
        assert!(platform.journal().is_empty());
        assert_eq!(controller.selected(), None);
        assert_eq!(
            drain(&mut rx),
            vec![RouteEvent::DevicesChanged {
                devices: vec![EndpointKind::Bluetooth, EndpointKind::Speaker]
            }]
        );
    }
}
