//! SQL DDL for the hub's tables.
//!
//! Foreign keys carry no `ON DELETE` action: dependent rows are cleaned up
//! explicitly by `HomeStorage` before the parent is removed.

/// SQLite schema. JSON columns are stored as TEXT, timestamps as RFC3339.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    icon TEXT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS integrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    type TEXT NOT NULL,
    name TEXT NOT NULL,
    is_connected INTEGER NOT NULL DEFAULT 0,
    access_token TEXT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    UNIQUE(user_id, type)
);

CREATE TABLE IF NOT EXISTS devices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    room_id INTEGER NULL REFERENCES rooms(id),
    integration_id INTEGER NULL REFERENCES integrations(id),
    external_id TEXT NULL, -- vendor device id for imported devices
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    is_on INTEGER NOT NULL DEFAULT 0,
    settings TEXT NOT NULL DEFAULT '{}',
    metadata TEXT NOT NULL DEFAULT '{}',
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, external_id)
);

CREATE INDEX IF NOT EXISTS idx_devices_user ON devices(user_id);

CREATE TABLE IF NOT EXISTS cameras (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL UNIQUE REFERENCES devices(id),
    stream_url TEXT NULL,
    status TEXT NOT NULL DEFAULT 'offline'
);

CREATE TABLE IF NOT EXISTS household_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    avatar_url TEXT NULL,
    face_embedding TEXT NULL, -- JSON array of floats, normalized
    preferences TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    member_id INTEGER NULL REFERENCES household_members(id),
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'info',
    is_read INTEGER NOT NULL DEFAULT 0,
    source TEXT NOT NULL DEFAULT 'manual',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_member ON notifications(user_id, member_id);

CREATE TABLE IF NOT EXISTS smartthings_connections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    access_token TEXT NOT NULL,
    refresh_token TEXT NULL,
    expires_at TEXT NOT NULL,
    installed_app_id TEXT NULL
);
"#;
