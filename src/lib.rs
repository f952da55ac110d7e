pub mod config;
pub mod db;
pub mod error;
pub mod face;
pub mod handlers;
pub mod llm;
pub mod middleware;
pub mod news;
pub mod router;
pub mod service;
pub mod smartthings;
pub mod tapo;
pub mod types;

pub use error::HubError;
pub use router::{HubState, hub_router};
