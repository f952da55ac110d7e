//! TP-Link Tapo cloud login and device import.

mod cloud;

pub use cloud::{TapoCloud, TapoDevice, infer_device_type};

use crate::db::{HomeStorage, IntegrationUpsert};
use crate::error::HubError;
use crate::types::device::{CameraStatus, DeviceType};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

pub const INTEGRATION_TYPE: &str = "tapo";

#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub name: Option<String>,
    pub model: Option<String>,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub online: bool,
}

#[derive(Debug, Serialize)]
pub struct TapoLoginOutcome {
    pub success: bool,
    pub devices_found: usize,
    pub devices_imported: usize,
    pub devices: Vec<DeviceSummary>,
}

/// Log in to the cloud, store the token and import every listed device.
pub async fn login_and_import(
    cloud: &TapoCloud,
    storage: &HomeStorage,
    user_id: &str,
    email: &str,
    password: &str,
) -> Result<TapoLoginOutcome, HubError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(HubError::BadRequest(
            "email and password are required".to_string(),
        ));
    }
    info!(user_id, "logging into tp-link cloud");
    let token = cloud.login(email, password).await?;
    let devices = cloud.device_list(&token).await?;
    info!(user_id, found = devices.len(), "tp-link devices listed");

    let integration = storage
        .upsert_integration(
            user_id,
            IntegrationUpsert {
                integration_type: INTEGRATION_TYPE.to_string(),
                name: "TP-Link Tapo".to_string(),
                is_connected: true,
                access_token: Some(token),
                metadata: Some(json!({ "email": email, "device_count": devices.len() })),
            },
        )
        .await?;

    let mut imported = 0;
    for device in &devices {
        let import = device.to_import(integration.id);
        let is_camera = import.device_type == DeviceType::Camera;
        let id = match storage.upsert_imported_device(user_id, import).await {
            Ok(id) => id,
            Err(e) => {
                warn!(device_id = %device.device_id, error = %e, "tapo device import failed");
                continue;
            }
        };
        if is_camera {
            let status = if device.is_online() {
                CameraStatus::Online
            } else {
                CameraStatus::Offline
            };
            storage.upsert_camera(id, status).await?;
        }
        imported += 1;
    }
    info!(user_id, imported, found = devices.len(), "tp-link devices imported");

    Ok(TapoLoginOutcome {
        success: true,
        devices_found: devices.len(),
        devices_imported: imported,
        devices: devices
            .iter()
            .map(|d| DeviceSummary {
                name: d.alias.clone().or_else(|| d.device_name.clone()),
                model: d.device_model.clone(),
                device_type: d.device_type(),
                online: d.is_online(),
            })
            .collect(),
    })
}
