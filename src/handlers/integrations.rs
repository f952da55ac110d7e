use crate::db::{DbIntegration, IntegrationUpsert};
use crate::middleware::UserContext;
use crate::{HubError, router::HubState};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct ActivateIntegration {
    #[serde(rename = "type")]
    pub integration_type: String,
    pub name: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

pub async fn list(
    State(state): State<HubState>,
    user: UserContext,
) -> Result<Json<Vec<DbIntegration>>, HubError> {
    Ok(Json(state.storage.list_integrations(&user.user_id).await?))
}

/// Mark an integration connected without a vendor handshake.
pub async fn activate(
    State(state): State<HubState>,
    user: UserContext,
    Json(body): Json<ActivateIntegration>,
) -> Result<Json<DbIntegration>, HubError> {
    let integration_type = body.integration_type.trim().to_lowercase();
    if integration_type.is_empty() {
        return Err(HubError::BadRequest("type is required".to_string()));
    }
    let integration = state
        .storage
        .upsert_integration(
            &user.user_id,
            IntegrationUpsert {
                integration_type,
                name: body.name,
                is_connected: true,
                access_token: body.access_token,
                metadata: body.metadata,
            },
        )
        .await?;
    Ok(Json(integration))
}

pub async fn disconnect(
    State(state): State<HubState>,
    user: UserContext,
    Path(integration_type): Path<String>,
) -> Result<StatusCode, HubError> {
    state
        .storage
        .disconnect_integration(&user.user_id, &integration_type)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
