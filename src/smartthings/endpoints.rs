use super::devices::DeviceList;
use crate::config::SmartThingsConfig;
use crate::error::HubError;

use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, ExtraTokenFields, RedirectUrl, RefreshToken, Scope,
    StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenType,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

/// Stateless SmartThings OAuth and REST endpoints.
pub(super) struct SmartThingsEndpoints;

impl SmartThingsEndpoints {
    /// Consent page URL carrying our signed `state`.
    pub(super) fn authorize_url(
        cfg: &SmartThingsConfig,
        client_id: &str,
        callback_url: &str,
        state: String,
    ) -> Result<String, HubError> {
        let client = OAuth2Client::<
            BasicErrorResponse,
            SmartThingsTokenResponse,
            BasicTokenIntrospectionResponse,
            StandardRevocableToken,
            BasicRevocationErrorResponse,
        >::new(ClientId::new(client_id.to_string()))
        .set_auth_uri(AuthUrl::new(cfg.authorize_url.clone())?)
        .set_redirect_uri(RedirectUrl::new(callback_url.to_string())?);
        let (url, _) = client
            .authorize_url(|| CsrfToken::new(state))
            .add_scopes(cfg.scopes.iter().cloned().map(Scope::new))
            .url();
        Ok(url.to_string())
    }

    /// Trade the authorization code for tokens. Client credentials go in Basic auth.
    pub(super) async fn exchange_code(
        cfg: &SmartThingsConfig,
        credentials: (&str, &str),
        callback_url: &str,
        code: String,
        http_client: &reqwest::Client,
    ) -> Result<SmartThingsTokenResponse, HubError> {
        let client = build_oauth2_client(cfg, credentials)?
            .set_redirect_uri(RedirectUrl::new(callback_url.to_string())?);
        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(http_client)
            .await?;
        info!(
            has_refresh_token = token.refresh_token().is_some(),
            has_installed_app_id = token.extra_fields().installed_app_id.is_some(),
            "smartthings code exchanged"
        );
        Ok(token)
    }

    pub(super) async fn refresh_access_token(
        cfg: &SmartThingsConfig,
        credentials: (&str, &str),
        refresh_token: &str,
        http_client: &reqwest::Client,
    ) -> Result<SmartThingsTokenResponse, HubError> {
        let client = build_oauth2_client(cfg, credentials)?;
        let token = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(http_client)
            .await?;
        info!("smartthings access token refreshed");
        Ok(token)
    }

    pub(super) async fn list_devices(
        cfg: &SmartThingsConfig,
        token: &str,
        http_client: &reqwest::Client,
    ) -> Result<DeviceList, HubError> {
        let resp = http_client
            .get(format!("{}/v1/devices", cfg.api_base.trim_end_matches('/')))
            .bearer_auth(token)
            .send()
            .await?;
        let resp = check_status(resp, "device list").await?;
        Ok(resp.json().await?)
    }

    /// `UpstreamStatus(401)` signals an expired or revoked token.
    pub(super) async fn send_commands(
        cfg: &SmartThingsConfig,
        token: &str,
        device_id: &str,
        body: &Value,
        http_client: &reqwest::Client,
    ) -> Result<Value, HubError> {
        let resp = http_client
            .post(format!(
                "{}/v1/devices/{}/commands",
                cfg.api_base.trim_end_matches('/'),
                device_id
            ))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let resp = check_status(resp, "device command").await?;
        Ok(resp.json().await.unwrap_or(Value::Null))
    }
}

async fn check_status(resp: reqwest::Response, what: &str) -> Result<reqwest::Response, HubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "smartthings {what} failed");
    Err(HubError::UpstreamStatus(status))
}

fn build_oauth2_client(
    cfg: &SmartThingsConfig,
    (client_id, client_secret): (&str, &str),
) -> Result<SmartThingsOauth2Client, HubError> {
    let client = OAuth2Client::new(ClientId::new(client_id.to_string()))
        .set_client_secret(ClientSecret::new(client_secret.to_string()))
        .set_auth_uri(AuthUrl::new(cfg.authorize_url.clone())?)
        .set_token_uri(TokenUrl::new(cfg.token_url.clone())?);
    Ok(client)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmartThingsTokenField {
    #[serde(default)]
    pub installed_app_id: Option<String>,
}
impl ExtraTokenFields for SmartThingsTokenField {}

pub type SmartThingsTokenResponse = StandardTokenResponse<SmartThingsTokenField, BasicTokenType>;

pub(super) type SmartThingsOauth2Client = OAuth2Client<
    BasicErrorResponse,
    SmartThingsTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
