use axum::extract::{FromRef, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::error::HubError;

const KEY_HEADER: &str = "x-hub-key";
const USER_HEADER: &str = "x-user-id";

fn key_matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Ensure the inbound request carries the hub key.
/// Accepts either:
/// - Header: `x-hub-key: ...`
/// - Header: `Authorization: Bearer ...`
/// - Query string: `?key=...`
pub fn ensure_authorized(
    headers: &HeaderMap,
    query: Option<&str>,
    expected: &str,
) -> Result<(), HubError> {
    if expected.is_empty() {
        return Err(HubError::Unauthorized);
    }

    if let Some(hv) = headers.get(KEY_HEADER).and_then(|v| v.to_str().ok())
        && key_matches(hv.trim(), expected)
    {
        return Ok(());
    }

    if let Some(auth) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && key_matches(token.trim(), expected)
        {
            return Ok(());
        }
    }

    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            if k == "key" && key_matches(&v, expected) {
                return Ok(());
            }
        }
    }

    Err(HubError::Unauthorized)
}

#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl<S> FromRequestParts<S> for RequireKeyAuth
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<Config>::from_ref(state);
        ensure_authorized(&parts.headers, parts.uri.query(), &config.basic.hub_key)?;
        Ok(Self)
    }
}

/// The authenticated household; every data query is scoped by `user_id`.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for UserContext
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        RequireKeyAuth::from_request_parts(parts, state).await?;
        let user_id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| HubError::BadRequest(format!("missing {USER_HEADER} header")))?;
        Ok(Self {
            user_id: user_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn key_is_accepted_from_any_location() {
        let mut headers = HeaderMap::new();
        assert!(ensure_authorized(&headers, None, "casa").is_err());
        assert!(ensure_authorized(&headers, Some("key=casa"), "casa").is_ok());
        assert!(ensure_authorized(&headers, Some("key=nope"), "casa").is_err());

        headers.insert(KEY_HEADER, HeaderValue::from_static("casa"));
        assert!(ensure_authorized(&headers, None, "casa").is_ok());

        let mut bearer = HeaderMap::new();
        bearer.insert("authorization", HeaderValue::from_static("Bearer casa"));
        assert!(ensure_authorized(&bearer, None, "casa").is_ok());
    }

    #[test]
    fn empty_configured_key_rejects_everything() {
        assert!(ensure_authorized(&HeaderMap::new(), Some("key="), "").is_err());
    }
}
