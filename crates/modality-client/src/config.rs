//! Client configuration.
//!
//! Loaded from TOML, then optionally overridden from the environment:
//!
//! ```toml
//! ingest_url = "modality-ingest-tls://ingest.example.com"
//! mutation_url = "modality-mutation://127.0.0.1"
//! timeout_ms = 1000
//! connect_timeout_ms = 10000
//! max_frame_len = 1048576
//! max_key_len = 1024
//! allow_insecure_tls = false
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_FRAME_LEN, DEFAULT_MAX_KEY_LEN, DEFAULT_REQUEST_TIMEOUT,
    ENV_ALLOW_INSECURE_TLS, ENV_INGEST_URL, ENV_MUTATION_URL, ENV_TIMEOUT_MS,
};
use crate::endpoint::{Endpoint, EndpointError, Plane};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Ingest service URL (`modality-ingest[-tls]://host[:port]`).
    pub ingest_url: String,

    /// Mutation-plane URL (`modality-mutation[-tls]://host[:port]`).
    pub mutation_url: String,

    /// Per round-trip timeout.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,

    /// TCP connect + TLS handshake timeout.
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,

    /// Largest inbound frame payload; larger frames kill the connection.
    pub max_frame_len: usize,

    /// Longest key name accepted locally. The server may lower it at auth.
    pub max_key_len: usize,

    /// Skip certificate verification on TLS endpoints. Test setups only.
    pub allow_insecure_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ingest_url: Endpoint::local(Plane::Ingest).to_string(),
            mutation_url: Endpoint::local(Plane::Mutation).to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_key_len: DEFAULT_MAX_KEY_LEN,
            allow_insecure_tls: false,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Apply `MODALITY_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_env_from(
        mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = get(ENV_INGEST_URL) {
            self.ingest_url = v;
        }
        if let Some(v) = get(ENV_MUTATION_URL) {
            self.mutation_url = v;
        }
        if let Some(v) = get(ENV_TIMEOUT_MS) {
            let ms = v.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_TIMEOUT_MS,
                value: v.clone(),
            })?;
            self.timeout = Duration::from_millis(ms);
        }
        if let Some(v) = get(ENV_ALLOW_INSECURE_TLS) {
            self.allow_insecure_tls = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: ENV_ALLOW_INSECURE_TLS,
                        value: v,
                    });
                }
            };
        }
        Ok(self)
    }

    pub fn ingest_endpoint(&self) -> Result<Endpoint, ConfigError> {
        endpoint_for(&self.ingest_url, Plane::Ingest)
    }

    pub fn mutation_endpoint(&self) -> Result<Endpoint, ConfigError> {
        endpoint_for(&self.mutation_url, Plane::Mutation)
    }
}

fn endpoint_for(url: &str, plane: Plane) -> Result<Endpoint, ConfigError> {
    let e = Endpoint::parse(url)?;
    if e.plane() != plane {
        return Err(ConfigError::WrongPlane {
            url: url.to_string(),
            expected: plane,
        });
    }
    Ok(e)
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("config read error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("'{url}' is not a {expected:?} endpoint")]
    WrongPlane { url: String, expected: Plane },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.timeout, Duration::from_secs(1));
        assert_eq!(c.ingest_endpoint().unwrap().port(), 14182);
        assert_eq!(c.mutation_endpoint().unwrap().port(), 14192);
        assert!(!c.allow_insecure_tls);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = ClientConfig::from_toml_str(
            r#"
            ingest_url = "modality-ingest-tls://ingest.example.com"
            timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(c.timeout, Duration::from_millis(250));
        assert!(c.ingest_endpoint().unwrap().is_secure());
        assert_eq!(c.max_frame_len, DEFAULT_MAX_FRAME_LEN);
    }

    #[test]
    fn test_toml_roundtrip() {
        let c = ClientConfig {
            max_key_len: 64,
            ..Default::default()
        };
        let text = toml::to_string(&c).unwrap();
        assert_eq!(ClientConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn test_load_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "allow_insecure_tls = true").unwrap();
        let c = ClientConfig::load(f.path()).unwrap();
        assert!(c.allow_insecure_tls);
        assert!(matches!(
            ClientConfig::load("/nonexistent/modality.toml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_INGEST_URL, "modality-ingest://10.1.1.1:9999"),
            (ENV_TIMEOUT_MS, "50"),
            (ENV_ALLOW_INSECURE_TLS, "yes"),
        ]
        .into_iter()
        .collect();
        let c = ClientConfig::default()
            .apply_env_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(c.ingest_endpoint().unwrap().port(), 9999);
        assert_eq!(c.timeout, Duration::from_millis(50));
        assert!(c.allow_insecure_tls);
    }

    #[test]
    fn test_env_bad_values() {
        let err = ClientConfig::default()
            .apply_env_from(|k| (k == ENV_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_TIMEOUT_MS, .. }));
    }

    #[test]
    fn test_wrong_plane() {
        let c = ClientConfig {
            ingest_url: "modality-mutation://127.0.0.1".into(),
            ..Default::default()
        };
        assert!(matches!(c.ingest_endpoint(), Err(ConfigError::WrongPlane { .. })));
    }
}
