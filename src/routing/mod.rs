//! Endpoint selection and route application

mod applier;
mod select;

pub use applier::{strategy_for, Capability, RouteStrategy};
pub use select::{select, Decision, Outcome};
