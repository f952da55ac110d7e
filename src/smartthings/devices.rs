use crate::db::DeviceImport;
use crate::types::device::DeviceType;
use serde::Deserialize;
use serde_json::{Value, json};

/// `GET /v1/devices` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub items: Vec<StDevice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StDevice {
    pub device_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub manufacturer_name: Option<String>,
    #[serde(default)]
    pub device_manufacturer_code: Option<String>,
    #[serde(default)]
    pub components: Vec<StComponent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StComponent {
    #[serde(default)]
    pub categories: Vec<Value>,
}

impl StDevice {
    pub fn display_name(&self) -> &str {
        [self.label.as_deref(), self.name.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or("Dispositivo SmartThings")
    }

    fn categories(&self) -> &[Value] {
        self.components
            .first()
            .map(|c| c.categories.as_slice())
            .unwrap_or_default()
    }

    /// Device type from the first component's category names.
    pub fn device_type(&self) -> DeviceType {
        let names: Vec<String> = self
            .categories()
            .iter()
            .filter_map(|c| c.get("name").and_then(Value::as_str))
            .map(str::to_lowercase)
            .collect();
        let has = |n: &str| names.iter().any(|c| c == n);

        if has("light") || has("switch") {
            DeviceType::Light
        } else if has("camera") {
            DeviceType::Camera
        } else if has("airconditioner") || has("thermostat") {
            DeviceType::Ac
        } else if has("television") || has("tv") {
            DeviceType::Tv
        } else if has("fan") {
            DeviceType::Fan
        } else if has("speaker") {
            DeviceType::Soundbar
        } else if has("sensor") || has("motionsensor") {
            DeviceType::Sensor
        } else {
            DeviceType::Switch
        }
    }

    pub fn to_import(&self, integration_id: i64) -> DeviceImport {
        DeviceImport {
            integration_id,
            external_id: self.device_id.clone(),
            name: self.display_name().to_string(),
            device_type: self.device_type(),
            is_on: false,
            metadata: json!({
                "smartthings_id": self.device_id,
                "manufacturer": self.manufacturer_name,
                "model": self.device_manufacturer_code,
                "categories": self.categories(),
            }),
        }
    }
}
