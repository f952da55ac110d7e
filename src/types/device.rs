use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Light,
    Ac,
    Tv,
    Camera,
    Fan,
    Soundbar,
    Sensor,
    Switch,
    Other,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Ac => "ac",
            Self::Tv => "tv",
            Self::Camera => "camera",
            Self::Fan => "fan",
            Self::Soundbar => "soundbar",
            Self::Sensor => "sensor",
            Self::Switch => "switch",
            Self::Other => "other",
        }
    }

    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "ac" => Self::Ac,
            "tv" => Self::Tv,
            "camera" => Self::Camera,
            "fan" => Self::Fan,
            "soundbar" => Self::Soundbar,
            "sensor" => Self::Sensor,
            "switch" => Self::Switch,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    Online,
    #[default]
    Offline,
}

impl CameraStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("online") {
            Self::Online
        } else {
            Self::Offline
        }
    }
}
