//! HTTP facade configuration.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";
pub const ENV_ADDR: &str = "MODALITY_MUTATOR_HTTP_ADDR";
pub const ENV_APIKEY: &str = "MODALITY_MUTATOR_APIKEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: SocketAddr,
    /// When set, every request must carry it in the `mutator_apikey` header.
    pub api_key: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            api_key: None,
        }
    }
}

impl HttpConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, HttpConfigError> {
        toml::from_str(s).map_err(|e| HttpConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, HttpConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HttpConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn apply_env(self) -> Result<Self, HttpConfigError> {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    pub fn apply_env_from(
        mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HttpConfigError> {
        if let Some(addr) = get(ENV_ADDR) {
            self.addr = addr
                .parse()
                .map_err(|_| HttpConfigError::InvalidEnv {
                    var: ENV_ADDR,
                    value: addr,
                })?;
        }
        if let Some(key) = get(ENV_APIKEY) {
            self.api_key = (!key.is_empty()).then_some(key);
        }
        Ok(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpConfigError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}
