use crate::face::{FaceMatch, MemberId, find_best_match};
use crate::middleware::UserContext;
use crate::service::FeedKey;
use crate::{HubError, router::HubState};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

const DEFAULT_SOURCE: &str = "default";

#[derive(Debug, Deserialize)]
pub struct FrameReading {
    /// `None` when the frame had no detectable face.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceQuery {
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FrameResult {
    /// Raw match for this frame.
    #[serde(rename = "match")]
    pub matched: Option<FaceMatch>,
    /// Member reported after smoothing over recent frames.
    pub recognized_member_id: Option<MemberId>,
}

#[derive(Debug, Serialize)]
pub struct CurrentRecognition {
    pub source: String,
    pub recognized_member_id: Option<MemberId>,
}

fn feed_key(user: &UserContext, source: Option<String>) -> FeedKey {
    let source = source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    FeedKey::new(user.user_id.clone(), source)
}

pub async fn observe_frame(
    State(state): State<HubState>,
    user: UserContext,
    Json(frame): Json<FrameReading>,
) -> Result<Json<FrameResult>, HubError> {
    let key = feed_key(&user, frame.source);
    let matched = match frame.embedding.filter(|e| !e.is_empty()) {
        Some(embedding) => {
            let enrolled = state.storage.enrolled_faces(&user.user_id).await?;
            find_best_match(&embedding, &enrolled, state.config.recognition.threshold)
        }
        None => None,
    };
    let recognized_member_id = state
        .recognition
        .observe(key, matched.map(|m| m.member_id))
        .await?;
    Ok(Json(FrameResult {
        matched,
        recognized_member_id,
    }))
}

pub async fn current(
    State(state): State<HubState>,
    user: UserContext,
    Query(query): Query<SourceQuery>,
) -> Result<Json<CurrentRecognition>, HubError> {
    let key = feed_key(&user, query.source);
    let source = key.source.clone();
    let recognized_member_id = state.recognition.current(key).await?;
    Ok(Json(CurrentRecognition {
        source,
        recognized_member_id,
    }))
}

pub async fn reset(
    State(state): State<HubState>,
    user: UserContext,
    Query(query): Query<SourceQuery>,
) -> Result<StatusCode, HubError> {
    state.recognition.reset(feed_key(&user, query.source))?;
    Ok(StatusCode::NO_CONTENT)
}
