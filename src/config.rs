use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use crate::error::HubError;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::warn;
use uuid::Uuid;

/// Process-wide configuration, loaded once on first access.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| panic!("FATAL: invalid configuration: {e}"))
});

const CONFIG_PATH_ENV: &str = "HUB_CONFIG";
const DEFAULT_HUB_KEY: &str = "casa";
const DEFAULT_STATE_SECRET: &str = "change-me";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub smartthings: SmartThingsConfig,
    pub tapo: TapoConfig,
    pub llm: LlmConfig,
    pub news: NewsConfig,
    pub recognition: RecognitionConfig,
}

impl Config {
    /// Defaults, then `config.toml` (or `$HUB_CONFIG`), then `HUB_*` env vars.
    ///
    /// Nested keys use `__`, e.g. `HUB_LLM__API_KEY`.
    pub fn load() -> Result<Self, figment::Error> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("HUB_").split("__"))
            .extract()
    }

    /// Refuse the well-known default hub key; a default OAuth state secret
    /// is replaced by a random one for this process.
    pub fn ensure_secrets(&mut self) -> Result<(), HubError> {
        let key = self.basic.hub_key.trim();
        if key.is_empty() || key == DEFAULT_HUB_KEY {
            return Err(HubError::NotConfigured(
                "basic.hub_key (set HUB_BASIC__HUB_KEY)",
            ));
        }
        let secret = self.smartthings.state_secret.trim();
        if secret.is_empty() || secret == DEFAULT_STATE_SECRET {
            warn!("smartthings.state_secret is unset; using a random per-process secret");
            self.smartthings.state_secret =
                format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        }
        Ok(())
    }

    /// Where SmartThings sends the browser back after consent.
    pub fn smartthings_callback_url(&self) -> String {
        format!(
            "{}/functions/smartthings-auth-callback",
            self.basic.public_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    pub hub_key: String,
    pub public_url: String,
    pub default_redirect_url: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:casa-hub.sqlite".to_string(),
            loglevel: "info".to_string(),
            hub_key: DEFAULT_HUB_KEY.to_string(),
            public_url: "http://localhost:8000".to_string(),
            default_redirect_url: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartThingsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// HMAC key for the OAuth `state` parameter.
    pub state_secret: String,
    pub api_base: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl Default for SmartThingsConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            state_secret: DEFAULT_STATE_SECRET.to_string(),
            api_base: "https://api.smartthings.com".to_string(),
            authorize_url: "https://api.smartthings.com/oauth/authorize".to_string(),
            token_url: "https://auth-global.api.smartthings.com/oauth/token".to_string(),
            scopes: vec![
                "r:devices:*".to_string(),
                "x:devices:*".to_string(),
                "r:locations:*".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TapoConfig {
    pub cloud_url: String,
}

impl Default for TapoConfig {
    fn default() -> Self {
        Self {
            cloud_url: "https://wap.tplinkcloud.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible base, `/chat/completions` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ai.gateway.lovable.dev/v1".to_string(),
            api_key: None,
            model: "google/gemini-3-flash-preview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    pub fetch_timeout_secs: u64,
    pub max_items_per_feed: usize,
    pub max_context_items: usize,
    pub recent_window_hours: i64,
    pub notifications_per_batch: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 5,
            max_items_per_feed: 10,
            max_context_items: 30,
            recent_window_hours: 48,
            notifications_per_batch: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub threshold: f32,
    pub window: usize,
    pub min_votes: usize,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            window: 3,
            min_votes: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.news.fetch_timeout_secs, 5);
        assert_eq!(cfg.news.max_items_per_feed, 10);
        assert_eq!(cfg.news.max_context_items, 30);
        assert_eq!(cfg.recognition.window, 3);
        assert_eq!(cfg.recognition.min_votes, 2);
        assert!((cfg.recognition.threshold - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn callback_url_ignores_trailing_slash() {
        let mut cfg = Config::default();
        cfg.basic.public_url = "https://hub.example.com/".to_string();
        assert_eq!(
            cfg.smartthings_callback_url(),
            "https://hub.example.com/functions/smartthings-auth-callback"
        );
    }

    #[test]
    fn default_hub_key_is_refused() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.ensure_secrets(),
            Err(HubError::NotConfigured(_))
        ));
        cfg.basic.hub_key = "  ".to_string();
        assert!(cfg.ensure_secrets().is_err());
    }

    #[test]
    fn default_state_secret_is_replaced() {
        let mut cfg = Config::default();
        cfg.basic.hub_key = "s3cret".to_string();
        cfg.ensure_secrets().unwrap();
        assert_ne!(cfg.smartthings.state_secret, DEFAULT_STATE_SECRET);
        assert_eq!(cfg.smartthings.state_secret.len(), 64);

        cfg.smartthings.state_secret = "mine".to_string();
        cfg.ensure_secrets().unwrap();
        assert_eq!(cfg.smartthings.state_secret, "mine");
    }
}
