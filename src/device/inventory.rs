//! Device inventory
//!
//! Tracks which endpoint categories are attached. Three detection styles
//! feed the same [`AvailableSet`]: a full rescan of the platform device
//! list, a capability bitmask pushed by the call-routing subsystem, and
//! single-category plug events on platforms without enumeration.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::kind::{AvailableSet, EndpointKind};
use crate::platform::DeviceType;

/// How the platform reports attached devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    /// Capability bitmask delivered with call audio state changes
    CapabilityMask,
    /// Attach/detach callbacks followed by a full rescan
    Enumeration,
    /// Wired-headset plug and Bluetooth headset events only
    Legacy,
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Detection::CapabilityMask => write!(f, "capability-mask"),
            Detection::Enumeration => write!(f, "enumerate"),
            Detection::Legacy => write!(f, "legacy"),
        }
    }
}

/// Current set of attached endpoint categories
#[derive(Debug, Clone, Default)]
pub struct DeviceInventory {
    available: AvailableSet,
    /// Last capability mask seen; 0 until the first report
    route_mask: u32,
}

impl DeviceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial inventory for platforms that cannot enumerate devices.
    ///
    /// A speaker is always assumed; the earpiece only exists on devices
    /// with telephony hardware.
    pub fn seeded_legacy(has_telephony: bool) -> Self {
        let mut inventory = Self::new();
        if has_telephony {
            inventory.available.insert(EndpointKind::Earpiece);
        }
        inventory.available.insert(EndpointKind::Speaker);
        inventory
    }

    pub fn available(&self) -> &AvailableSet {
        &self.available
    }

    /// Rebuild the set from a full device list.
    ///
    /// Returns `true` if the set of categories changed.
    pub fn recompute(&mut self, devices: &[DeviceType]) -> bool {
        let next: AvailableSet = devices.iter().filter_map(DeviceType::endpoint).collect();
        self.replace(next)
    }

    /// Decode a capability mask.
    ///
    /// The set is only rebuilt when the raw mask differs from the previous
    /// one. Returns `true` in that case.
    pub fn apply_capability_mask(&mut self, mask: u32) -> bool {
        if mask == self.route_mask {
            return false;
        }
        self.route_mask = mask;
        self.available = AvailableSet::from_route_mask(mask);
        debug!(mask, available = %self.available, "capability mask changed");
        true
    }

    /// Returns `true` if the set changed
    pub fn apply_legacy_headset_state(&mut self, present: bool) -> bool {
        self.toggle(EndpointKind::WiredHeadset, present)
    }

    /// Returns `true` if the set changed
    pub fn apply_legacy_bluetooth_state(&mut self, present: bool) -> bool {
        self.toggle(EndpointKind::Bluetooth, present)
    }

    fn toggle(&mut self, kind: EndpointKind, present: bool) -> bool {
        let changed = if present {
            self.available.insert(kind)
        } else {
            self.available.remove(kind)
        };
        if changed {
            debug!(device = %kind, present, available = %self.available, "device toggled");
        }
        changed
    }

    fn replace(&mut self, next: AvailableSet) -> bool {
        if next == self.available {
            return false;
        }
        debug!(from = %self.available, to = %next, "available devices changed");
        self.available = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::kind::{ROUTE_BLUETOOTH, ROUTE_EARPIECE, ROUTE_SPEAKER};

    #[test]
    fn test_recompute_collapses_and_ignores_unknown() {
        let mut inventory = DeviceInventory::new();
        let changed = inventory.recompute(&[
            DeviceType::WiredHeadset,
            DeviceType::UsbHeadset,
            DeviceType::Other("hdmi".into()),
            DeviceType::BuiltinSpeaker,
        ]);
        assert!(changed);
        let available: Vec<_> = inventory.available().iter().collect();
        assert_eq!(available, vec![EndpointKind::WiredHeadset, EndpointKind::Speaker]);

        // Same categories from a different physical list is not a change
        assert!(!inventory.recompute(&[DeviceType::WiredHeadphones, DeviceType::BuiltinSpeaker]));
    }

    #[test]
    fn test_capability_mask_only_changes_on_new_mask() {
        let mut inventory = DeviceInventory::new();
        assert!(inventory.apply_capability_mask(ROUTE_EARPIECE | ROUTE_SPEAKER));
        assert!(!inventory.apply_capability_mask(ROUTE_EARPIECE | ROUTE_SPEAKER));
        assert!(inventory.apply_capability_mask(ROUTE_EARPIECE | ROUTE_SPEAKER | ROUTE_BLUETOOTH));
        assert!(inventory.available().contains(EndpointKind::Bluetooth));
    }

    #[test]
    fn test_empty_mask_before_first_report_is_not_a_change() {
        let mut inventory = DeviceInventory::new();
        assert!(!inventory.apply_capability_mask(0));
    }

    #[test]
    fn test_legacy_seed_and_toggles() {
        let mut inventory = DeviceInventory::seeded_legacy(false);
        assert!(!inventory.available().contains(EndpointKind::Earpiece));
        assert!(inventory.available().contains(EndpointKind::Speaker));

        assert!(inventory.apply_legacy_headset_state(true));
        assert!(!inventory.apply_legacy_headset_state(true));
        assert!(inventory.apply_legacy_bluetooth_state(true));
        assert!(inventory.apply_legacy_bluetooth_state(false));
        assert!(!inventory.available().contains(EndpointKind::Bluetooth));
        assert!(inventory.available().contains(EndpointKind::WiredHeadset));

        let phone = DeviceInventory::seeded_legacy(true);
        assert!(phone.available().contains(EndpointKind::Earpiece));
    }
}
