use super::{DraftNotification, NotificationModel, SelectionRequest};
use crate::config::LlmConfig;
use crate::error::HubError;
use crate::types::notification::NotificationKind;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

const TOOL_NAME: &str = "create_notifications";

/// OpenAI-compatible chat completions client forcing a single tool call.
pub struct ChatCompletionsModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionsModel {
    pub fn new(client: reqwest::Client, cfg: &LlmConfig) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
            model: cfg.model.clone(),
        }
    }

    fn body<'a>(&'a self, request: &'a SelectionRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system_prompt,
                },
                Message {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            tools: vec![notification_tool()],
            tool_choice: json!({ "type": "function", "function": { "name": TOOL_NAME } }),
        }
    }
}

#[async_trait]
impl NotificationModel for ChatCompletionsModel {
    fn name(&self) -> &'static str {
        "chat-completions"
    }

    async fn select(&self, request: &SelectionRequest) -> Result<Vec<DraftNotification>, HubError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(HubError::NotConfigured("LLM API key"))?;

        let resp = self
            .client
            .post(self.endpoint.as_str())
            .bearer_auth(api_key)
            .json(&self.body(request))
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => return Err(HubError::RateLimited),
            StatusCode::PAYMENT_REQUIRED => return Err(HubError::PaymentRequired),
            s if !s.is_success() => {
                let text = resp.text().await.unwrap_or_default();
                error!(status = %s, body = %text, "LLM gateway error");
                return Err(HubError::Llm(format!("gateway returned {s}")));
            }
            _ => {}
        }

        let payload: ChatResponse = resp.json().await?;
        let drafts = parse_tool_call(payload)?;
        info!(model = %self.model, count = drafts.len(), "LLM selected notifications");
        Ok(drafts)
    }
}

fn notification_tool() -> Value {
    let kinds = NotificationKind::ALL;
    json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Create a list of personalized notifications based on real news",
            "parameters": {
                "type": "object",
                "properties": {
                    "notifications": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string", "description": "Short title (max 60 chars)" },
                                "message": { "type": "string", "description": "Brief description (max 120 chars)" },
                                "type": { "type": "string", "enum": kinds }
                            },
                            "required": ["title", "message", "type"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["notifications"],
                "additionalProperties": false
            }
        }
    })
}

fn parse_tool_call(payload: ChatResponse) -> Result<Vec<DraftNotification>, HubError> {
    let arguments = payload
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.tool_calls.into_iter().next())
        .map(|call| call.function.arguments)
        .ok_or_else(|| HubError::Llm("no tool call in response".to_string()))?;

    let parsed: ToolArguments = serde_json::from_str(&arguments)
        .map_err(|e| HubError::Llm(format!("malformed tool arguments: {e}")))?;
    Ok(parsed.notifications)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    tools: Vec<Value>,
    tool_choice: Value,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: ToolFunction,
}

#[derive(Deserialize)]
struct ToolFunction {
    arguments: String,
}

#[derive(Deserialize)]
struct ToolArguments {
    #[serde(default)]
    notifications: Vec<DraftNotification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_forces_the_notification_tool() {
        let model = ChatCompletionsModel::new(reqwest::Client::new(), &LlmConfig::default());
        let req = SelectionRequest {
            system_prompt: "sys".into(),
            user_prompt: "user".into(),
        };
        let body = serde_json::to_value(model.body(&req)).unwrap();
        assert_eq!(body["tool_choice"]["function"]["name"], TOOL_NAME);
        assert_eq!(body["tools"][0]["function"]["name"], TOOL_NAME);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[test]
    fn tool_arguments_are_decoded() {
        let payload: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": {
                            "name": TOOL_NAME,
                            "arguments": "{\"notifications\":[{\"title\":\"t\",\"message\":\"m\",\"type\":\"alert\"}]}"
                        }
                    }]
                }
            }]
        }))
        .unwrap();
        let drafts = parse_tool_call(payload).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].kind, "alert");
    }

    #[test]
    fn missing_tool_call_is_an_error() {
        let payload: ChatResponse =
            serde_json::from_value(json!({ "choices": [{ "message": { "content": "hi" } }] }))
                .unwrap();
        assert!(matches!(parse_tool_call(payload), Err(HubError::Llm(_))));
    }
}
