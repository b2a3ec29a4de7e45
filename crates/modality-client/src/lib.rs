//! Modality protocol client library
//!
//! Streams timelines of events to an ingest server and serves mutators to a
//! mutation server. Both planes share one framed, authenticated session type.
//! Use [`connect_ingest`] / [`connect_mutation`] for the common path, or build
//! a [`Session`] over any stream (in-memory pipes in tests).

pub mod auth;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod keys;
pub mod mutation;
pub mod mutator;
pub mod protocol;
pub mod session;
pub mod tls;

pub use auth::{AuthToken, AuthTokenError};
pub use config::{ClientConfig, ConfigError};
pub use endpoint::{Endpoint, EndpointError, Plane};
pub use error::{Error, Result};
pub use frame::{FrameCodec, FrameError};
pub use ingest::{IngestClient, IngestState};
pub use keys::{AttrKey, KeyRegistry};
pub use mutation::{MutationClient, MutationState};
pub use mutator::{CommandError, Mutator, MutatorError, MutatorHost};
pub use protocol::{CommandResult, IngestStatus, Outcome, PendingCommand};
pub use session::{Session, SessionState, Transport};

pub use modality_types as types;

/// Connect to the configured ingest endpoint and authenticate.
pub async fn connect_ingest(config: &ClientConfig, token: &AuthToken) -> Result<IngestClient> {
    let mut client = IngestClient::connect(config).await?;
    client.authenticate(token).await?;
    Ok(client)
}

/// Connect to the configured mutation endpoint and authenticate as `participant`.
pub async fn connect_mutation(
    config: &ClientConfig,
    token: &AuthToken,
    participant: types::ParticipantId,
) -> Result<MutationClient> {
    let mut client = MutationClient::connect(config, participant).await?;
    client.authenticate(token).await?;
    Ok(client)
}
