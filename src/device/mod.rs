//! Endpoint categories and the device inventory

mod inventory;
mod kind;

pub use inventory::{Detection, DeviceInventory};
pub use kind::{AvailableSet, EndpointKind};
