use crate::db::{CameraPatch, DashboardStats, DbCamera, DbDevice, DevicePatch, NewDevice};
use crate::middleware::UserContext;
use crate::{HubError, router::HubState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct DeviceFilter {
    pub room_id: Option<i64>,
}

pub async fn list(
    State(state): State<HubState>,
    user: UserContext,
    Query(filter): Query<DeviceFilter>,
) -> Result<Json<Vec<DbDevice>>, HubError> {
    Ok(Json(
        state
            .storage
            .list_devices(&user.user_id, filter.room_id)
            .await?,
    ))
}

pub async fn get_one(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<Json<DbDevice>, HubError> {
    Ok(Json(state.storage.get_device(&user.user_id, id).await?))
}

pub async fn create(
    State(state): State<HubState>,
    user: UserContext,
    Json(device): Json<NewDevice>,
) -> Result<(StatusCode, Json<DbDevice>), HubError> {
    if device.name.trim().is_empty() {
        return Err(HubError::BadRequest("name is required".to_string()));
    }
    let device = state.storage.create_device(&user.user_id, device).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn update(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
    Json(patch): Json<DevicePatch>,
) -> Result<Json<DbDevice>, HubError> {
    Ok(Json(
        state.storage.update_device(&user.user_id, id, patch).await?,
    ))
}

pub async fn toggle(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<Json<DbDevice>, HubError> {
    Ok(Json(state.storage.toggle_device(&user.user_id, id).await?))
}

pub async fn delete(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, HubError> {
    state.storage.delete_device(&user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_cameras(
    State(state): State<HubState>,
    user: UserContext,
) -> Result<Json<Vec<DbCamera>>, HubError> {
    Ok(Json(state.storage.list_cameras(&user.user_id).await?))
}

pub async fn update_camera(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
    Json(patch): Json<CameraPatch>,
) -> Result<Json<DbCamera>, HubError> {
    Ok(Json(
        state.storage.update_camera(&user.user_id, id, patch).await?,
    ))
}

pub async fn stats(
    State(state): State<HubState>,
    user: UserContext,
) -> Result<Json<DashboardStats>, HubError> {
    Ok(Json(state.storage.dashboard_stats(&user.user_id).await?))
}
