//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection settings for `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Prefix for every relative request URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds; `None` waits indefinitely.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Read `API_BASE_URL` and `API_TIMEOUT_SECS`, falling back to defaults.
    /// A timeout of `0` disables the timeout.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("API_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Some(secs) = std::env::var("API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout_secs = (secs > 0).then_some(secs);
        }
        config
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
