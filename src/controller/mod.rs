//! Mode controller module
//!
//! Serializes all routing state behind a single worker:
//! - Mode transitions (Idle, AudioCall, VideoCall)
//! - Device inventory updates from platform events
//! - Endpoint selection and route application

mod handle;
mod machine;
mod mode;

pub use handle::{global, install, ControllerHandle};
pub use machine::{DeviceSnapshot, ModeController};
pub use mode::{AudioMode, ModeConstants};
