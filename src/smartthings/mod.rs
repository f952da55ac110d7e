//! Samsung SmartThings: OAuth connection, device import, commands and
//! SmartApp lifecycle callbacks.

pub mod commands;
pub mod devices;
mod endpoints;
pub mod service;
pub mod state;
pub mod webhook;

pub use commands::{CommandRequest, DeviceCommand};
pub use service::{CallbackParams, SmartThingsService, SyncOutcome};
pub use state::OAuthState;
pub use webhook::{LifecycleAction, handle_lifecycle};
