use crate::db::{DbMember, MemberPatch, NewMember};
use crate::middleware::UserContext;
use crate::{HubError, router::HubState};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// Member as shown to the dashboard; the raw embedding stays server-side.
#[derive(Debug, Serialize)]
pub struct MemberView {
    #[serde(flatten)]
    pub member: DbMember,
    pub has_face: bool,
}

impl From<DbMember> for MemberView {
    fn from(member: DbMember) -> Self {
        let has_face = member.has_face();
        Self { member, has_face }
    }
}

#[derive(Debug, Deserialize)]
pub struct FaceEnrollment {
    pub embedding: Option<Vec<f32>>,
}

pub async fn list(
    State(state): State<HubState>,
    user: UserContext,
) -> Result<Json<Vec<MemberView>>, HubError> {
    let members = state.storage.list_members(&user.user_id).await?;
    Ok(Json(members.into_iter().map(MemberView::from).collect()))
}

pub async fn get_one(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<Json<MemberView>, HubError> {
    Ok(Json(state.storage.get_member(&user.user_id, id).await?.into()))
}

pub async fn create(
    State(state): State<HubState>,
    user: UserContext,
    Json(member): Json<NewMember>,
) -> Result<(StatusCode, Json<MemberView>), HubError> {
    if member.name.trim().is_empty() {
        return Err(HubError::BadRequest("name is required".to_string()));
    }
    let member = state.storage.create_member(&user.user_id, member).await?;
    Ok((StatusCode::CREATED, Json(member.into())))
}

pub async fn update(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
    Json(patch): Json<MemberPatch>,
) -> Result<Json<MemberView>, HubError> {
    Ok(Json(
        state
            .storage
            .update_member(&user.user_id, id, patch)
            .await?
            .into(),
    ))
}

/// PUT /api/members/{id}/face; a null or empty embedding clears enrollment.
pub async fn enroll_face(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
    Json(body): Json<FaceEnrollment>,
) -> Result<Json<MemberView>, HubError> {
    if body
        .embedding
        .as_ref()
        .is_some_and(|e| e.iter().any(|v| !v.is_finite()))
    {
        return Err(HubError::BadRequest(
            "embedding must contain finite numbers".to_string(),
        ));
    }
    Ok(Json(
        state
            .storage
            .set_face_embedding(&user.user_id, id, body.embedding)
            .await?
            .into(),
    ))
}

pub async fn delete(
    State(state): State<HubState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> Result<StatusCode, HubError> {
    state.storage.delete_member(&user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
