use crate::types::device::{CameraStatus, DeviceType};
use crate::types::member::Preferences;
use crate::types::notification::{NotificationKind, NotificationSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DbRoom {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DbDevice {
    pub id: i64,
    pub room_id: Option<i64>,
    pub integration_id: Option<i64>,
    pub external_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub is_on: bool,
    pub settings: Value,
    pub metadata: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DbCamera {
    pub id: i64,
    pub device_id: i64,
    pub device_name: String,
    pub stream_url: Option<String>,
    pub status: CameraStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DbMember {
    pub id: i64,
    pub name: String,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub face_embedding: Option<Vec<f32>>,
    pub preferences: Preferences,
}

impl DbMember {
    pub fn has_face(&self) -> bool {
        self.face_embedding.as_ref().is_some_and(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DbNotification {
    pub id: i64,
    pub member_id: Option<i64>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub source: NotificationSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DbIntegration {
    pub id: i64,
    #[serde(rename = "type")]
    pub integration_type: String,
    pub name: String,
    pub is_connected: bool,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbSmartThingsConnection {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub installed_app_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub devices_total: i64,
    pub devices_on: i64,
    pub lights_on: i64,
    pub cameras_online: i64,
    pub unread_notifications: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub integration_id: Option<i64>,
    /// Only used for cameras.
    #[serde(default)]
    pub stream_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevicePatch {
    pub name: Option<String>,
    /// `Some(None)` detaches the device from its room.
    #[serde(default, with = "double_option")]
    pub room_id: Option<Option<i64>>,
    pub is_on: Option<bool>,
    /// Merged key by key into the stored settings object.
    pub settings: Option<Value>,
}

/// Device discovered through a vendor integration.
#[derive(Debug, Clone)]
pub struct DeviceImport {
    pub integration_id: i64,
    pub external_id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub is_on: bool,
    pub metadata: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraPatch {
    pub stream_url: Option<String>,
    pub status: Option<CameraStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    #[serde(default)]
    pub member_id: Option<i64>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(skip, default)]
    pub source: NotificationSource,
}

#[derive(Debug, Clone)]
pub struct IntegrationUpsert {
    pub integration_type: String,
    pub name: String,
    pub is_connected: bool,
    /// `None` keeps the stored token.
    pub access_token: Option<String>,
    /// `None` keeps the stored metadata.
    pub metadata: Option<Value>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_patch_distinguishes_null_room() {
        let absent: DevicePatch = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.room_id, None);

        let cleared: DevicePatch = serde_json::from_str(r#"{"room_id":null}"#).unwrap();
        assert_eq!(cleared.room_id, Some(None));

        let moved: DevicePatch = serde_json::from_str(r#"{"room_id":4}"#).unwrap();
        assert_eq!(moved.room_id, Some(Some(4)));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let integration = DbIntegration {
            id: 1,
            integration_type: "tapo".into(),
            name: "TP-Link Tapo".into(),
            is_connected: true,
            access_token: Some("secret".into()),
            metadata: Value::Null,
        };
        let json = serde_json::to_string(&integration).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains(r#""type":"tapo""#));
    }
}
