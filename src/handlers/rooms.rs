use crate::db::{DbRoom, NewRoom, RoomPatch};
use crate::middleware::UserContext;
use crate::{HubError, router::HubState};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

pub async fn list(
    State(state): State<HubState>,
    user: UserContext,
) -> Result<Json<Vec<DbRoom>>, HubError> {
    Ok(Json(state.storage.list_rooms(&user.user_id).await?))
}

pub async fn create(
    State(state): State<HubState>,
    user: UserContext,
    Json(room): Json<NewRoom>,
) -> Result<(StatusCode, Json<DbRoom>), HubError> {
    if room.name.trim().is_empty() {
        return Err(HubError::BadRequest("name is required".to_string()));
    }
    let room = state.storage.create_room(&user.user_id, room).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn update(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
    Json(patch): Json<RoomPatch>,
) -> Result<Json<DbRoom>, HubError> {
    Ok(Json(state.storage.update_room(&user.user_id, id, patch).await?))
}

pub async fn delete(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, HubError> {
    state.storage.delete_room(&user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
