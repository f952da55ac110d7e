use crate::db::DeviceImport;
use crate::error::HubError;
use crate::types::device::DeviceType;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

/// Minimal client for the TP-Link cloud JSON-RPC endpoint.
#[derive(Clone)]
pub struct TapoCloud {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct CloudResponse {
    #[serde(default = "missing_code")]
    error_code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

fn missing_code() -> i64 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapoDevice {
    pub device_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub device_model: Option<String>,
    #[serde(default, rename = "deviceType")]
    pub kind: Option<String>,
    #[serde(default)]
    pub fw_ver: Option<String>,
    #[serde(default)]
    pub device_mac: Option<String>,
    #[serde(default)]
    pub app_server_url: Option<String>,
    #[serde(default)]
    pub status: i64,
}

impl TapoCloud {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    async fn call(&self, token: Option<&str>, body: Value) -> Result<CloudResponse, HubError> {
        let mut req = self.http.post(&self.url).json(&body);
        if let Some(token) = token {
            req = req.query(&[("token", token)]);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            warn!(status = %status, "tp-link cloud returned an error status");
            return Err(HubError::Vendor(format!(
                "TP-Link cloud returned {status}"
            )));
        }
        Ok(resp.json().await?)
    }

    /// Returns the session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, HubError> {
        let resp = self
            .call(
                None,
                json!({
                    "method": "login",
                    "params": {
                        "appType": "Kasa_Android",
                        "cloudUserName": email,
                        "cloudPassword": password,
                        "terminalUUID": uuid::Uuid::new_v4().to_string(),
                    }
                }),
            )
            .await?;
        let token = resp
            .result
            .as_ref()
            .and_then(|r| r.get("token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty());
        match (resp.error_code, token) {
            (0, Some(token)) => Ok(token.to_string()),
            (code, _) => {
                warn!(error_code = code, msg = ?resp.msg, "tp-link cloud login failed");
                Err(HubError::Vendor(
                    "TP-Link cloud login failed. Check email and password.".to_string(),
                ))
            }
        }
    }

    pub async fn device_list(&self, token: &str) -> Result<Vec<TapoDevice>, HubError> {
        let resp = self
            .call(Some(token), json!({ "method": "getDeviceList" }))
            .await?;
        if resp.error_code != 0 {
            warn!(error_code = resp.error_code, msg = ?resp.msg, "tp-link device list failed");
            return Err(HubError::Vendor(
                "Could not list TP-Link devices.".to_string(),
            ));
        }
        let list = resp
            .result
            .and_then(|mut r| r.get_mut("deviceList").map(Value::take))
            .unwrap_or(Value::Array(Vec::new()));
        Ok(serde_json::from_value(list)?)
    }
}

impl TapoDevice {
    pub fn is_online(&self) -> bool {
        self.status == 1
    }

    pub fn device_type(&self) -> DeviceType {
        infer_device_type(self.kind.as_deref(), self.device_model.as_deref())
    }

    pub fn to_import(&self, integration_id: i64) -> DeviceImport {
        let name = self
            .alias
            .clone()
            .or_else(|| self.device_name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Tapo {}", self.device_model.as_deref().unwrap_or("")));
        DeviceImport {
            integration_id,
            external_id: self.device_id.clone(),
            name: name.trim().to_string(),
            device_type: self.device_type(),
            is_on: self.is_online(),
            metadata: json!({
                "model": self.device_model,
                "device_type": self.kind,
                "firmware": self.fw_ver,
                "mac": self.device_mac,
                "app_server_url": self.app_server_url,
            }),
        }
    }
}

/// Device type from the cloud's `deviceType` and the model prefix.
pub fn infer_device_type(kind: Option<&str>, model: Option<&str>) -> DeviceType {
    let model = model.unwrap_or("").to_lowercase();
    let kind = kind.unwrap_or("").to_lowercase();
    if model.starts_with('c') || kind.contains("camera") {
        DeviceType::Camera
    } else if model.starts_with('l') || kind.contains("bulb") || kind.contains("light") {
        DeviceType::Light
    } else if model.starts_with('p') || kind.contains("plug") || kind.contains("switch") {
        DeviceType::Switch
    } else if kind.contains("fan") {
        DeviceType::Fan
    } else {
        DeviceType::Other
    }
}
