//! Notification selection through a chat-completions model.

pub mod chat;

pub use chat::ChatCompletionsModel;

use crate::error::HubError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Prompts for one selection round.
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// One notification as returned by the model, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftNotification {
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Picks notifications out of real news items.
///
/// Implementations must fail rather than return a partial list: the caller
/// replaces stored notifications only on `Ok`.
#[async_trait]
pub trait NotificationModel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn select(&self, request: &SelectionRequest) -> Result<Vec<DraftNotification>, HubError>;
}
