//! Auth tokens.
//!
//! Tokens are opaque bytes, exchanged as lowercase hex. A token can come from
//! the caller directly, from `MODALITY_AUTH_TOKEN`, or from the user token
//! file `<context dir>/.user_auth_token` whose first line is the hex token.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::{ENV_AUTH_TOKEN, ENV_CONTEXT_DIR};

/// File name of the per-user token file inside the context directory.
pub const USER_AUTH_TOKEN_FILE_NAME: &str = ".user_auth_token";

const DEFAULT_CONTEXT_DIR: &str = "modality_cli";

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(Vec<u8>);

impl AuthToken {
    /// Decode from a hex string. Surrounding whitespace is ignored.
    pub fn from_hex(s: &str) -> Result<Self, AuthTokenError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AuthTokenError::Empty);
        }
        hex::decode(s)
            .map(Self)
            .map_err(|e| AuthTokenError::InvalidHex(e.to_string()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Resolve the token from the environment, then the user token file.
    pub fn load() -> Result<Self, AuthTokenError> {
        if let Ok(s) = std::env::var(ENV_AUTH_TOKEN) {
            return Self::from_hex(&s);
        }
        let path = context_dir()?.join(USER_AUTH_TOKEN_FILE_NAME);
        if path.exists() {
            return Self::read_file(&path);
        }
        Err(AuthTokenError::NotFound)
    }

    /// Read a token file: hex on the first line, anything after is ignored.
    pub fn read_file(path: &Path) -> Result<Self, AuthTokenError> {
        let contents = std::fs::read_to_string(path).map_err(|e| AuthTokenError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let first = contents
            .lines()
            .next()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| AuthTokenError::EmptyFile(path.to_path_buf()))?;
        Self::from_hex(first)
    }
}

impl From<Vec<u8>> for AuthToken {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl AsRef<[u8]> for AuthToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Never print token material.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken({} bytes)", self.0.len())
    }
}

fn context_dir() -> Result<PathBuf, AuthTokenError> {
    if let Some(dir) = std::env::var_os(ENV_CONTEXT_DIR) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|d| d.join(DEFAULT_CONTEXT_DIR))
        .ok_or(AuthTokenError::NoConfigDir)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthTokenError {
    #[error("auth token is empty")]
    Empty,
    #[error("auth token is not valid hex: {0}")]
    InvalidHex(String),
    #[error("no auth token in file {}", .0.display())]
    EmptyFile(PathBuf),
    #[error("could not read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
    #[error("could not determine the user config directory")]
    NoConfigDir,
    #[error("no auth token found (set MODALITY_AUTH_TOKEN or log in)")]
    NotFound,
}
