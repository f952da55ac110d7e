//! Endpoints under `/functions/*`: vendor handshakes and notification generation.

use crate::db::DbDevice;
use crate::middleware::UserContext;
use crate::service::NotificationPipeline;
use crate::smartthings::{
    CallbackParams, CommandRequest, LifecycleAction, SyncOutcome, handle_lifecycle,
};
use crate::tapo::{self, TapoLoginOutcome};
use crate::{HubError, router::HubState};
use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub member_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub count: usize,
}

/// POST /functions/generate-notifications
pub async fn generate_notifications(
    State(state): State<HubState>,
    user: UserContext,
    body: Option<Json<GenerateRequest>>,
) -> Result<Json<GenerateResponse>, HubError> {
    let member_id = body.and_then(|Json(b)| b.member_id);
    let pipeline = NotificationPipeline {
        storage: &state.storage,
        http: &state.client,
        model: state.llm.as_ref(),
        feeds: &state.feeds,
        news: &state.config.news,
    };
    let stored = pipeline.run(&user.user_id, member_id).await?;
    Ok(Json(GenerateResponse {
        success: true,
        count: stored.len(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthStartRequest {
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthStartResponse {
    pub url: String,
}

/// POST /functions/smartthings-auth-start
pub async fn smartthings_auth_start(
    State(state): State<HubState>,
    user: UserContext,
    body: Option<Json<AuthStartRequest>>,
) -> Result<Json<AuthStartResponse>, HubError> {
    let redirect_url = body
        .and_then(|Json(b)| b.redirect_url)
        .filter(|u| !u.trim().is_empty());
    let url = state.smartthings.start_auth(&user.user_id, redirect_url)?;
    Ok(Json(AuthStartResponse { url }))
}

/// GET /functions/smartthings-auth-callback, reached by the browser after consent.
pub async fn smartthings_auth_callback(
    State(state): State<HubState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let target = state.smartthings.complete_auth(params).await;
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub device_id: i64,
    pub command: CommandRequest,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub device: DbDevice,
    pub result: Value,
}

/// POST /functions/smartthings-control
pub async fn smartthings_control(
    State(state): State<HubState>,
    user: UserContext,
    Json(body): Json<ControlRequest>,
) -> Result<Json<ControlResponse>, HubError> {
    let (device, result) = state
        .smartthings
        .control(&user.user_id, body.device_id, body.command)
        .await?;
    Ok(Json(ControlResponse {
        success: true,
        device,
        result,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub token: String,
}

/// POST /functions/smartthings-sync
pub async fn smartthings_sync(
    State(state): State<HubState>,
    user: UserContext,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncOutcome>, HubError> {
    Ok(Json(state.smartthings.sync(&user.user_id, &body.token).await?))
}

/// POST /functions/smartthings-webhook, called by SmartThings itself.
pub async fn smartthings_webhook(
    State(state): State<HubState>,
    body: Option<Json<Value>>,
) -> Json<Value> {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);
    match handle_lifecycle(&body) {
        LifecycleAction::Reply(reply) => Json(reply),
        LifecycleAction::Confirm { url, reply } => {
            match url {
                Some(url) => match state.client.get(&url).send().await {
                    Ok(resp) => info!(status = %resp.status(), "smartapp confirmation sent"),
                    Err(e) => warn!(error = %e, "smartapp confirmation failed"),
                },
                None => warn!("confirmation lifecycle without a usable confirmationUrl"),
            }
            Json(reply)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TapoLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /functions/tapo-login
pub async fn tapo_login(
    State(state): State<HubState>,
    user: UserContext,
    Json(body): Json<TapoLoginRequest>,
) -> Result<Json<TapoLoginOutcome>, HubError> {
    let outcome = tapo::login_and_import(
        &state.tapo,
        &state.storage,
        &user.user_id,
        &body.email,
        &body.password,
    )
    .await?;
    Ok(Json(outcome))
}
