//! Endpoint categories and the set of currently available endpoints
//!
//! Categories carry the telecom route bits so that capability masks and
//! active-route ids can be decoded without a lookup table.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownDevice;

/// Route bit for the builtin earpiece
pub const ROUTE_EARPIECE: u32 = 0x1;
/// Route bit for a Bluetooth headset
pub const ROUTE_BLUETOOTH: u32 = 0x2;
/// Route bit for a wired (or USB) headset
pub const ROUTE_WIRED_HEADSET: u32 = 0x4;
/// Route bit for the builtin speaker
pub const ROUTE_SPEAKER: u32 = 0x8;

/// Logical audio endpoint category.
///
/// Variant order is the automatic selection priority, so ordered
/// collections list endpoints from most to least preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointKind {
    Bluetooth,
    #[serde(rename = "HEADPHONES", alias = "WIRED_HEADSET")]
    WiredHeadset,
    Earpiece,
    Speaker,
}

impl EndpointKind {
    pub const ALL: [EndpointKind; 4] = [
        EndpointKind::Bluetooth,
        EndpointKind::WiredHeadset,
        EndpointKind::Earpiece,
        EndpointKind::Speaker,
    ];

    /// Category name used on the wire
    pub fn name(&self) -> &'static str {
        match self {
            EndpointKind::Bluetooth => "BLUETOOTH",
            EndpointKind::WiredHeadset => "HEADPHONES",
            EndpointKind::Earpiece => "EARPIECE",
            EndpointKind::Speaker => "SPEAKER",
        }
    }

    /// Call-routing route id (and capability mask bit) for this category
    pub fn route_bit(&self) -> u32 {
        match self {
            EndpointKind::Bluetooth => ROUTE_BLUETOOTH,
            EndpointKind::WiredHeadset => ROUTE_WIRED_HEADSET,
            EndpointKind::Earpiece => ROUTE_EARPIECE,
            EndpointKind::Speaker => ROUTE_SPEAKER,
        }
    }
}

impl std::fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EndpointKind {
    type Err = UnknownDevice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BLUETOOTH" => Ok(EndpointKind::Bluetooth),
            "HEADPHONES" | "WIRED_HEADSET" => Ok(EndpointKind::WiredHeadset),
            "EARPIECE" => Ok(EndpointKind::Earpiece),
            "SPEAKER" => Ok(EndpointKind::Speaker),
            other => Err(UnknownDevice(other.to_string())),
        }
    }
}

/// Set of endpoint categories currently attached
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableSet(BTreeSet<EndpointKind>);

impl AvailableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a capability bitmask. Unknown bits are ignored.
    pub fn from_route_mask(mask: u32) -> Self {
        EndpointKind::ALL
            .into_iter()
            .filter(|kind| mask & kind.route_bit() == kind.route_bit())
            .collect()
    }

    pub fn contains(&self, kind: EndpointKind) -> bool {
        self.0.contains(&kind)
    }

    /// Returns `true` if the set changed
    pub fn insert(&mut self, kind: EndpointKind) -> bool {
        self.0.insert(kind)
    }

    /// Returns `true` if the set changed
    pub fn remove(&mut self, kind: EndpointKind) -> bool {
        self.0.remove(&kind)
    }

    /// Iterate in priority order
    pub fn iter(&self) -> impl Iterator<Item = EndpointKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<EndpointKind> for AvailableSet {
    fn from_iter<I: IntoIterator<Item = EndpointKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for AvailableSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(|kind| kind.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_alias() {
        assert_eq!("SPEAKER".parse::<EndpointKind>(), Ok(EndpointKind::Speaker));
        assert_eq!(
            "WIRED_HEADSET".parse::<EndpointKind>(),
            Ok(EndpointKind::WiredHeadset)
        );
        assert_eq!(
            "speaker".parse::<EndpointKind>(),
            Err(UnknownDevice("speaker".to_string()))
        );
    }

    #[test]
    fn test_mask_decoding() {
        let set = AvailableSet::from_route_mask(ROUTE_EARPIECE | ROUTE_SPEAKER | 0x100);
        assert!(set.contains(EndpointKind::Earpiece));
        assert!(set.contains(EndpointKind::Speaker));
        assert!(!set.contains(EndpointKind::Bluetooth));
        assert_eq!(AvailableSet::from_route_mask(0), AvailableSet::new());
    }

    #[test]
    fn test_iteration_follows_priority() {
        let set: AvailableSet = [
            EndpointKind::Speaker,
            EndpointKind::Earpiece,
            EndpointKind::Bluetooth,
        ]
        .into_iter()
        .collect();
        assert_eq!(set.to_string(), "[BLUETOOTH, EARPIECE, SPEAKER]");
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&EndpointKind::WiredHeadset).unwrap();
        assert_eq!(json, r#""HEADPHONES""#);
        let kind: EndpointKind = serde_json::from_str(r#""WIRED_HEADSET""#).unwrap();
        assert_eq!(kind, EndpointKind::WiredHeadset);
    }
}
