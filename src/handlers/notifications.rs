use crate::db::{DbNotification, NewNotification};
use crate::middleware::UserContext;
use crate::{HubError, router::HubState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationFilter {
    pub member_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReadFlag {
    #[serde(default = "default_read")]
    pub is_read: bool,
}

fn default_read() -> bool {
    true
}

pub async fn list(
    State(state): State<HubState>,
    user: UserContext,
    Query(filter): Query<NotificationFilter>,
) -> Result<Json<Vec<DbNotification>>, HubError> {
    Ok(Json(
        state
            .storage
            .list_notifications(&user.user_id, filter.member_id)
            .await?,
    ))
}

/// Manual notifications only; generated ones come from the pipeline.
pub async fn create(
    State(state): State<HubState>,
    user: UserContext,
    Json(notification): Json<NewNotification>,
) -> Result<(StatusCode, Json<DbNotification>), HubError> {
    if notification.title.trim().is_empty() {
        return Err(HubError::BadRequest("title is required".to_string()));
    }
    let created = state
        .storage
        .create_notification(&user.user_id, notification)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn mark_read(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
    Json(flag): Json<ReadFlag>,
) -> Result<Json<DbNotification>, HubError> {
    Ok(Json(
        state
            .storage
            .mark_read(&user.user_id, id, flag.is_read)
            .await?,
    ))
}

pub async fn delete(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, HubError> {
    state.storage.delete_notification(&user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
