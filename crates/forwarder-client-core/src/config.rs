use std::path::PathBuf;

use forwarder_gateway::{
    BackendGatewayConfig, DEFAULT_BACKEND_BASE_URL, DEFAULT_TIMEOUT_MS, GatewayError,
    MAX_TIMEOUT_MS, MIN_TIMEOUT_MS, normalize_base_url,
};

use crate::session::default_session_path;

pub const ENV_BACKEND_BASE_URL: &str = "FORWARDER_BACKEND_BASE_URL";
pub const ENV_BACKEND_TIMEOUT_MS: &str = "FORWARDER_BACKEND_TIMEOUT_MS";
pub const ENV_STATE_PATH: &str = "FORWARDER_STATE_PATH";
pub const SOURCE_DEFAULT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid FORWARDER_BACKEND_BASE_URL: {0}")]
    InvalidBaseUrl(#[from] GatewayError),
    #[error("invalid FORWARDER_BACKEND_TIMEOUT_MS: {0}")]
    InvalidTimeout(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub backend_base_url: String,
    pub backend_base_url_source: &'static str,
    pub timeout_ms: u64,
    pub state_path: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let (backend_base_url, backend_base_url_source) = resolve_backend_base_url()?;
        let timeout_ms = resolve_timeout_ms()?;
        let state_path = env_non_empty(ENV_STATE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(default_session_path);
        Ok(Self {
            backend_base_url,
            backend_base_url_source,
            timeout_ms,
            state_path,
        })
    }

    #[must_use]
    pub fn gateway_config(&self) -> BackendGatewayConfig {
        BackendGatewayConfig {
            base_url: self.backend_base_url.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_base_url: DEFAULT_BACKEND_BASE_URL.to_string(),
            backend_base_url_source: SOURCE_DEFAULT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            state_path: default_session_path(),
        }
    }
}

pub fn resolve_backend_base_url() -> Result<(String, &'static str), ConfigError> {
    if let Some(base_url) = env_non_empty(ENV_BACKEND_BASE_URL) {
        return Ok((normalize_base_url(&base_url)?, ENV_BACKEND_BASE_URL));
    }
    Ok((normalize_base_url(DEFAULT_BACKEND_BASE_URL)?, SOURCE_DEFAULT))
}

pub fn resolve_timeout_ms() -> Result<u64, ConfigError> {
    let Some(raw) = env_non_empty(ENV_BACKEND_TIMEOUT_MS) else {
        return Ok(DEFAULT_TIMEOUT_MS);
    };
    raw.parse::<u64>()
        .map(|value| value.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS))
        .map_err(|error| ConfigError::InvalidTimeout(format!("{raw}: {error}")))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
