use super::commands::{CommandRequest, DeviceCommand};
use super::endpoints::{SmartThingsEndpoints, SmartThingsTokenResponse};
use super::state::OAuthState;
use crate::config::Config;
use crate::db::{DbDevice, DbSmartThingsConnection, HomeStorage, IntegrationUpsert};
use crate::error::HubError;
use crate::types::device::{CameraStatus, DeviceType};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

pub const INTEGRATION_TYPE: &str = "smartthings";
const INTEGRATION_NAME: &str = "Samsung SmartThings";
const DEFAULT_EXPIRES_IN_SECS: i64 = 86_400;

/// Query string SmartThings sends the browser back with.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub devices_imported: usize,
    pub integration_id: i64,
}

/// OAuth handshake, device import and command dispatch for SmartThings.
#[derive(Clone)]
pub struct SmartThingsService {
    config: Arc<Config>,
    storage: HomeStorage,
    http: reqwest::Client,
}

impl SmartThingsService {
    pub fn new(config: Arc<Config>, storage: HomeStorage, http: reqwest::Client) -> Self {
        Self {
            config,
            storage,
            http,
        }
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        let st = &self.config.smartthings;
        Some((st.client_id.as_deref()?, st.client_secret.as_deref()?))
    }

    /// Build the consent URL for `user_id`.
    pub fn start_auth(&self, user_id: &str, redirect_url: Option<String>) -> Result<String, HubError> {
        let client_id = self
            .config
            .smartthings
            .client_id
            .as_deref()
            .ok_or(HubError::NotConfigured("SmartThings client id"))?;
        let redirect_url =
            redirect_url.unwrap_or_else(|| self.config.basic.default_redirect_url.clone());
        let state = OAuthState::new(user_id, redirect_url)
            .sign(&self.config.smartthings.state_secret)
            .ok_or(HubError::NotConfigured("SmartThings state secret"))?;
        info!(user_id, "starting smartthings oauth");
        SmartThingsEndpoints::authorize_url(
            &self.config.smartthings,
            client_id,
            &self.config.smartthings_callback_url(),
            state,
        )
    }

    /// Finish the OAuth dance. Always yields the URL to redirect the browser to.
    pub async fn complete_auth(&self, params: CallbackParams) -> String {
        let fallback = self.config.basic.default_redirect_url.as_str();
        if let Some(err) = params.error {
            warn!(error = %err, "smartthings oauth error");
            return redirect_with(fallback, &[("smartthings", "error"), ("message", &err)]);
        }
        let (Some(code), Some(state)) = (params.code, params.state) else {
            warn!("smartthings callback without code or state");
            return failed(fallback, "missing_params");
        };
        let Some(state) = OAuthState::verify(&state, &self.config.smartthings.state_secret) else {
            warn!("invalid or expired smartthings state");
            return failed(fallback, "invalid_state");
        };
        let redirect = state.redirect_url.as_str();
        let Some(credentials) = self.credentials() else {
            error!("smartthings client credentials are not configured");
            return failed(redirect, "missing_client_credentials");
        };

        let token = match SmartThingsEndpoints::exchange_code(
            &self.config.smartthings,
            credentials,
            &self.config.smartthings_callback_url(),
            code,
            &self.http,
        )
        .await
        {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "smartthings token exchange failed");
                return failed(redirect, "token_exchange_failed");
            }
        };

        let conn = DbSmartThingsConnection {
            user_id: state.user_id.clone(),
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_at: expiry(&token),
            installed_app_id: token.extra_fields().installed_app_id.clone(),
        };
        if let Err(e) = self.storage.upsert_connection(&conn).await {
            error!(error = %e, "saving smartthings tokens failed");
            return failed(redirect, "save_failed");
        }

        let user_id = state.user_id.as_str();
        match self
            .storage
            .upsert_integration(user_id, integration_upsert(None, None))
            .await
        {
            Ok(integration) => {
                if let Err(e) = self
                    .import_devices(user_id, integration.id, &conn.access_token)
                    .await
                {
                    warn!(error = %e, "smartthings device import after connect failed");
                }
            }
            Err(e) => warn!(error = %e, "marking smartthings integration connected failed"),
        }
        info!(user_id, "smartthings connected");
        redirect_with(redirect, &[("smartthings", "connected")])
    }

    /// Pull the device list and upsert every device. Returns how many were imported.
    pub async fn import_devices(
        &self,
        user_id: &str,
        integration_id: i64,
        token: &str,
    ) -> Result<usize, HubError> {
        let list = SmartThingsEndpoints::list_devices(&self.config.smartthings, token, &self.http)
            .await?;
        self.store_devices(user_id, integration_id, &list.items).await
    }

    async fn store_devices(
        &self,
        user_id: &str,
        integration_id: i64,
        devices: &[super::devices::StDevice],
    ) -> Result<usize, HubError> {
        let mut imported = 0;
        for device in devices {
            let import = device.to_import(integration_id);
            let is_camera = import.device_type == DeviceType::Camera;
            match self.storage.upsert_imported_device(user_id, import).await {
                Ok(id) => {
                    if is_camera {
                        self.storage.upsert_camera(id, CameraStatus::Offline).await?;
                    }
                    imported += 1;
                }
                Err(e) => warn!(device_id = %device.device_id, error = %e, "device import failed"),
            }
        }
        self.storage
            .merge_integration_metadata(
                user_id,
                INTEGRATION_TYPE,
                json!({ "devices_count": devices.len() }),
            )
            .await?;
        info!(user_id, imported, "smartthings devices imported");
        Ok(imported)
    }

    /// Connect with a personal access token and import its devices.
    pub async fn sync(&self, user_id: &str, token: &str) -> Result<SyncOutcome, HubError> {
        if token.trim().is_empty() {
            return Err(HubError::BadRequest("token is required".to_string()));
        }
        let list = SmartThingsEndpoints::list_devices(&self.config.smartthings, token, &self.http)
            .await?;
        let integration = self
            .storage
            .upsert_integration(
                user_id,
                integration_upsert(
                    Some(token.to_string()),
                    Some(json!({ "devices_count": list.items.len() })),
                ),
            )
            .await?;
        let devices_imported = self
            .store_devices(user_id, integration.id, &list.items)
            .await?;
        Ok(SyncOutcome {
            success: true,
            devices_imported,
            integration_id: integration.id,
        })
    }

    /// Send one command to a SmartThings device and mirror the result locally.
    pub async fn control(
        &self,
        user_id: &str,
        device_id: i64,
        command: CommandRequest,
    ) -> Result<(DbDevice, Value), HubError> {
        let device = self.storage.get_device(user_id, device_id).await?;
        let command = DeviceCommand::try_from(command)?;
        let remote_id = device
            .metadata
            .get("smartthings_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| device.external_id.clone())
            .ok_or_else(|| {
                HubError::BadRequest("device has no SmartThings configuration".to_string())
            })?;

        let connection = self.storage.get_connection(user_id).await?;
        let token = match &connection {
            Some(conn) => conn.access_token.clone(),
            None => self
                .storage
                .get_integration(user_id, INTEGRATION_TYPE)
                .await?
                .and_then(|i| i.access_token)
                .ok_or_else(|| {
                    HubError::BadRequest("device has no SmartThings configuration".to_string())
                })?,
        };

        let body = command.to_request_body();
        info!(user_id, device_id, remote_id = %remote_id, "sending smartthings command");
        let result = match self.send(&token, &remote_id, &body).await {
            Err(HubError::UpstreamStatus(StatusCode::UNAUTHORIZED)) => {
                let fresh = self.refresh(connection.as_ref()).await?;
                self.send(&fresh, &remote_id, &body)
                    .await
                    .map_err(|e| match e {
                        HubError::UpstreamStatus(StatusCode::UNAUTHORIZED) => {
                            HubError::ReconnectRequired("SmartThings")
                        }
                        other => other,
                    })?
            }
            other => other?,
        };

        let (is_on, settings) = command.state_change();
        let device = self
            .storage
            .set_device_state(user_id, device_id, is_on, settings)
            .await?;
        Ok((device, result))
    }

    async fn send(&self, token: &str, remote_id: &str, body: &Value) -> Result<Value, HubError> {
        SmartThingsEndpoints::send_commands(
            &self.config.smartthings,
            token,
            remote_id,
            body,
            &self.http,
        )
        .await
    }

    /// Exchange the stored refresh token once. Anything short of a new
    /// access token means the user has to reconnect.
    async fn refresh(&self, connection: Option<&DbSmartThingsConnection>) -> Result<String, HubError> {
        let reconnect = HubError::ReconnectRequired("SmartThings");
        let Some(conn) = connection else {
            return Err(reconnect);
        };
        let (Some(refresh_token), Some(credentials)) =
            (conn.refresh_token.as_deref(), self.credentials())
        else {
            return Err(reconnect);
        };
        let token = match SmartThingsEndpoints::refresh_access_token(
            &self.config.smartthings,
            credentials,
            refresh_token,
            &self.http,
        )
        .await
        {
            Ok(token) => token,
            Err(e) => {
                warn!(user_id = %conn.user_id, error = %e, "smartthings token refresh failed");
                return Err(reconnect);
            }
        };
        let access_token = token.access_token().secret().clone();
        self.storage
            .update_connection_tokens(
                &conn.user_id,
                &access_token,
                token.refresh_token().map(|t| t.secret().as_str()),
                expiry(&token),
            )
            .await?;
        Ok(access_token)
    }
}

fn integration_upsert(access_token: Option<String>, metadata: Option<Value>) -> IntegrationUpsert {
    IntegrationUpsert {
        integration_type: INTEGRATION_TYPE.to_string(),
        name: INTEGRATION_NAME.to_string(),
        is_connected: true,
        access_token,
        metadata,
    }
}

fn expiry(token: &SmartThingsTokenResponse) -> chrono::DateTime<Utc> {
    expires_at(Utc::now(), token.expires_in().map(|d| d.as_secs()))
}

/// `now + expires_in`; absent or unrepresentable lifetimes use the default.
fn expires_at(now: chrono::DateTime<Utc>, expires_in: Option<u64>) -> chrono::DateTime<Utc> {
    let default = now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS);
    expires_in
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(default)
}

fn failed(base: &str, reason: &str) -> String {
    redirect_with(base, &[("smartthings", "error"), ("message", reason)])
}

/// Append query parameters to `base`, keeping any it already has.
pub fn redirect_with(base: &str, params: &[(&str, &str)]) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            {
                let mut pairs = url.query_pairs_mut();
                for (k, v) in params {
                    pairs.append_pair(k, v);
                }
            }
            url.to_string()
        }
        Err(_) => {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| {
                    let v: String = url::form_urlencoded::byte_serialize(v.as_bytes()).collect();
                    format!("{k}={v}")
                })
                .collect();
            format!("{base}?{}", query.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_keeps_existing_query() {
        assert_eq!(
            redirect_with("https://app.example.com/settings?tab=1", &[("smartthings", "connected")]),
            "https://app.example.com/settings?tab=1&smartthings=connected"
        );
        assert_eq!(
            redirect_with("https://app.example.com", &[("smartthings", "error"), ("message", "access denied")]),
            "https://app.example.com/?smartthings=error&message=access+denied"
        );
    }

    #[test]
    fn oversized_token_lifetime_falls_back_to_default() {
        let token: SmartThingsTokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "token_type": "bearer",
            "expires_in": i64::MAX,
        }))
        .unwrap();
        let before = Utc::now();
        let at = expiry(&token);
        assert!(at >= before + Duration::seconds(DEFAULT_EXPIRES_IN_SECS));
        assert!(at <= Utc::now() + Duration::seconds(DEFAULT_EXPIRES_IN_SECS));

        let now = Utc::now();
        assert_eq!(
            expires_at(now, Some(u64::MAX)),
            now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS)
        );
        assert_eq!(expires_at(now, Some(3600)), now + Duration::seconds(3600));
        assert_eq!(
            expires_at(now, None),
            now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS)
        );
    }
}
