use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued `state` stays valid, in minutes.
pub const STATE_TTL_MINUTES: i64 = 15;

/// Payload carried through the OAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthState {
    pub user_id: String,
    pub redirect_url: String,
    /// Issue time in milliseconds since the epoch.
    pub ts: i64,
}

impl OAuthState {
    pub fn new(user_id: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            redirect_url: redirect_url.into(),
            ts: Utc::now().timestamp_millis(),
        }
    }

    /// `base64url(json) + "." + base64url(hmac_sha256(json))`.
    pub fn sign(&self, secret: &str) -> Option<String> {
        let data = serde_json::to_vec(self).ok()?;
        let sig = mac(secret, &data)?.finalize().into_bytes();
        Some(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&data),
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    /// Verify signature and age. Any malformed input yields `None`.
    pub fn verify(state: &str, secret: &str) -> Option<Self> {
        let (data_b64, sig_b64) = state.split_once('.')?;
        let data = URL_SAFE_NO_PAD.decode(data_b64).ok()?;
        let sig = URL_SAFE_NO_PAD.decode(sig_b64).ok()?;
        mac(secret, &data)?.verify_slice(&sig).ok()?;

        let parsed: OAuthState = serde_json::from_slice(&data).ok()?;
        let age = Utc::now().timestamp_millis() - parsed.ts;
        if age > Duration::minutes(STATE_TTL_MINUTES).num_milliseconds() {
            return None;
        }
        Some(parsed)
    }
}

fn mac(secret: &str, data: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(data);
    Some(mac)
}
