use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

pub const SETTINGS_FILE: &str = "settings.json";

const ENV_API_URL: &str = "MONSTER_PRACTICE_API_URL";
const ENV_TOKEN: &str = "MONSTER_PRACTICE_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub batch_size: usize,
    pub animation_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
    pub reward_display_ms: u64,
    pub max_visible_rewards: usize,
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            access_token: String::new(),
            refresh_token: None,
            batch_size: 10,
            animation_ms: 500,
            max_retries: 3,
            retry_backoff_ms: 1000,
            request_timeout_secs: 30,
            reward_display_ms: 1800,
            max_visible_rewards: 3,
            dark_mode: true,
        }
    }
}

impl Settings {
    /// Applies environment overrides on top of the persisted values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::var(ENV_API_URL).ok(), std::env::var(ENV_TOKEN).ok())
    }

    fn with_overrides(mut self, api_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.access_token = token.trim().to_string();
        }
        self
    }

    /// Zero batch sizes would stall prefetching, so they are clamped.
    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn reward_display(&self) -> Duration {
        Duration::from_millis(self.reward_display_ms)
    }
}
