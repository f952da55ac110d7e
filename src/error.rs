use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum HubError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("Invalid or missing hub key")]
    Unauthorized,

    #[error("{0} token expired; reconnect the integration")]
    ReconnectRequired(&'static str),

    #[error("LLM rate limit exceeded")]
    RateLimited,

    #[error("LLM payment required")]
    PaymentRequired,

    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    #[error("Vendor error: {0}")]
    Vendor(String),

    #[error("LLM response error: {0}")]
    Llm(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for HubError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => HubError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                HubError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => HubError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => HubError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            HubError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found."),
            ),
            HubError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            HubError::UnsupportedCommand(cmd) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                format!("Unsupported command: {cmd}"),
            ),
            HubError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid or missing hub key.".to_string(),
            ),
            HubError::ReconnectRequired(integration) => (
                StatusCode::UNAUTHORIZED,
                "RECONNECT_REQUIRED",
                format!("{integration} token expired. Please reconnect the integration."),
            ),
            HubError::Oauth2Token(_) | HubError::Oauth2Server { .. } => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication error.".to_string(),
            ),
            HubError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT",
                "Rate limit exceeded, try again later.".to_string(),
            ),
            HubError::PaymentRequired => (
                StatusCode::PAYMENT_REQUIRED,
                "PAYMENT_REQUIRED",
                "Payment required.".to_string(),
            ),
            HubError::UpstreamStatus(code) => {
                let msg = match *code {
                    StatusCode::UNAUTHORIZED => "Upstream authentication failed.",
                    StatusCode::FORBIDDEN => "Upstream permission denied.",
                    StatusCode::NOT_FOUND => "Upstream resource not found.",
                    _ => "An upstream error occurred.",
                };
                (*code, "UPSTREAM_ERROR", msg.to_string())
            }
            HubError::Vendor(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone()),
            HubError::Reqwest(_) | HubError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.".to_string(),
            ),
            HubError::Llm(_) => (
                StatusCode::BAD_GATEWAY,
                "LLM_ERROR",
                "The notification model returned an unusable response.".to_string(),
            ),
            HubError::NotConfigured(what) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NOT_CONFIGURED",
                format!("{what} is not configured."),
            ),
            HubError::DatabaseError(_) | HubError::RactorError(_) | HubError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.".to_string(),
            ),
        };
        let body = ApiErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
