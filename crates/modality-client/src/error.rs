//! Client error taxonomy.

use std::time::Duration;

use modality_types::{CodecError, MutatorId, TimelineId};

use crate::auth::AuthTokenError;
use crate::config::ConfigError;
use crate::endpoint::EndpointError;
use crate::keys::AttrKey;
use crate::tls::TlsError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Connect ─────────────────────────────────────────────────────────
    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),
    #[error(transparent)]
    Tls(#[from] TlsError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    // ── Auth ────────────────────────────────────────────────────────────
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("not authenticated")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────────
    #[error("disconnected")]
    Disconnected,
    #[error("frame too large: {size} bytes exceeds maximum {max} bytes")]
    FrameTooLarge { size: usize, max: usize },
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("write stalled for {0:?}; connection dropped")]
    WriteTimeout(Duration),
    #[error("unexpected response: {0}")]
    Protocol(String),

    // ── Caller data ─────────────────────────────────────────────────────
    #[error(transparent)]
    MalformedValue(#[from] CodecError),
    #[error("unknown attribute key {0}")]
    UnknownKey(AttrKey),
    #[error("invalid key name: {0}")]
    InvalidKeyName(String),

    // ── State machine ───────────────────────────────────────────────────
    #[error("{op} is not valid while {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },
    #[error("timeline {0} is already open")]
    TimelineAlreadyOpen(TimelineId),
    #[error("mutator id {0} is already registered")]
    DuplicateMutatorId(MutatorId),
    #[error("no mutator registered as {0}")]
    UnknownMutator(MutatorId),

    // ── Setup ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    AuthToken(#[from] AuthTokenError),
}

impl Error {
    /// True when the session that produced this error can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Disconnected
                | Error::WriteTimeout(_)
                | Error::FrameTooLarge { .. }
                | Error::MalformedFrame(_)
                | Error::Protocol(_)
                | Error::Auth(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
