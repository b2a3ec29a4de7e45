//! Client configuration constants.
//!
//! Centralizes defaults for endpoints, timeouts, and protocol limits.

use std::time::Duration;

/// Default host for both planes.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Ingest service port (plain TCP).
pub const DEFAULT_INGEST_PORT: u16 = 14182;

/// Ingest service port (TLS).
pub const DEFAULT_INGEST_TLS_PORT: u16 = 14184;

/// Mutation-plane service port (plain TCP).
pub const DEFAULT_MUTATION_PORT: u16 = 14192;

/// Mutation-plane service port (TLS).
pub const DEFAULT_MUTATION_TLS_PORT: u16 = 14194;

/// Per round-trip timeout applied to every request and poll.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout for TCP connect plus TLS handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest frame payload accepted from the server.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Longest attribute key name accepted unless the server says otherwise.
pub const DEFAULT_MAX_KEY_LEN: usize = 1024;

/// Mutation-plane protocol version sent during authentication.
pub const MUTATION_PROTOCOL_VERSION: u32 = 1;

/// Bytes in the frame length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

// ── Environment variables ───────────────────────────────────────────────────

pub const ENV_AUTH_TOKEN: &str = "MODALITY_AUTH_TOKEN";
pub const ENV_CONTEXT_DIR: &str = "MODALITY_CONTEXT_DIR";
pub const ENV_INGEST_URL: &str = "MODALITY_INGEST_URL";
pub const ENV_MUTATION_URL: &str = "MODALITY_MUTATION_URL";
pub const ENV_TIMEOUT_MS: &str = "MODALITY_CLIENT_TIMEOUT_MS";
pub const ENV_ALLOW_INSECURE_TLS: &str = "MODALITY_ALLOW_INSECURE_TLS";
