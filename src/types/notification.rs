use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Alert,
    Reminder,
    Task,
}

impl NotificationKind {
    pub const ALL: [&'static str; 4] = ["info", "alert", "reminder", "task"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Alert => "alert",
            Self::Reminder => "reminder",
            Self::Task => "task",
        }
    }

    /// Unknown kinds collapse to `Info`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "alert" => Self::Alert,
            "reminder" => Self::Reminder,
            "task" => Self::Task,
            _ => Self::Info,
        }
    }
}

/// Who created a notification; only `Generated` rows are replaced by a new batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSource {
    #[default]
    Manual,
    Generated,
}

impl NotificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Generated => "generated",
        }
    }

    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("generated") {
            Self::Generated
        } else {
            Self::Manual
        }
    }
}
