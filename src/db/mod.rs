//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows plus insert/patch inputs
//! - `schema.rs`: SQL DDL for initializing the database (SQLite)
//! - `sqlite.rs`: pool setup, `HomeStorage` and shared row helpers
//! - one file per table group with the `HomeStorage` queries for it

pub mod devices;
pub mod households;
pub mod integrations;
pub mod models;
pub mod notifications;
pub mod rooms;
pub mod schema;
pub mod sqlite;

pub use models::*;
pub use schema::SQLITE_INIT;
pub use sqlite::{HomeStorage, SqlitePool, connect};
