//! Axum handlers, one module per resource group.

pub mod devices;
pub mod functions;
pub mod integrations;
pub mod members;
pub mod notifications;
pub mod recognition;
pub mod rooms;
