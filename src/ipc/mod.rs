//! IPC module for application and platform-bridge communication

mod protocol;
mod server;

pub use server::Server;
