pub mod auth;

pub use auth::{RequireKeyAuth, UserContext, ensure_authorized};
