//! Endpoint selection
//!
//! Pure domain logic - no I/O, no platform dependencies.

use crate::controller::AudioMode;
use crate::device::{AvailableSet, EndpointKind};

/// Whether the chosen endpoint differs from the one already applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A route has to be applied
    Changed,
    /// The endpoint is already in use; nothing to do
    Unchanged,
}

/// Result of a selection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub endpoint: EndpointKind,
    pub outcome: Outcome,
    /// The override was set but is no longer available and must be cleared
    pub stale_override: bool,
}

/// Pick the endpoint for `mode`.
///
/// Priority without an override:
/// 1. Bluetooth
/// 2. Wired headset
/// 3. Earpiece (audio calls only)
/// 4. Speaker (fallback, even if not reported)
///
/// An override that is still available wins outright.
pub fn select(
    mode: AudioMode,
    available: &AvailableSet,
    user_override: Option<EndpointKind>,
    previous: Option<EndpointKind>,
) -> Decision {
    let usable_override = user_override.filter(|device| available.contains(*device));
    let stale_override = user_override.is_some() && usable_override.is_none();

    let endpoint = usable_override.unwrap_or_else(|| automatic(mode, available));

    let outcome = if previous == Some(endpoint) {
        Outcome::Unchanged
    } else {
        Outcome::Changed
    };

    Decision {
        endpoint,
        outcome,
        stale_override,
    }
}

fn automatic(mode: AudioMode, available: &AvailableSet) -> EndpointKind {
    if available.contains(EndpointKind::Bluetooth) {
        EndpointKind::Bluetooth
    } else if available.contains(EndpointKind::WiredHeadset) {
        EndpointKind::WiredHeadset
    } else if mode == AudioMode::AudioCall && available.contains(EndpointKind::Earpiece) {
        EndpointKind::Earpiece
    } else {
        EndpointKind::Speaker
    }
}
