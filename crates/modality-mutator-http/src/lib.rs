//! HTTP front end for modality mutators.
//!
//! Serves the same [`MutatorHost`] the native mutation client drives, so a
//! mutator behaves identically whichever way commands reach it. There is no
//! registration step: every request names its mutator by correlation id.

pub mod api;
pub mod config;
pub mod doc;
pub mod error;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use modality_client::MutatorHost;
use tokio::net::TcpListener;

pub use api::{AppState, MUTATOR_API_KEY_HEADER, MutatorInfo, MutationRequest};
pub use config::{HttpConfig, HttpConfigError};
pub use error::ApiError;

/// Build the router over `host`. `api_key`, when set, guards every mutator route.
pub fn router(host: Arc<MutatorHost>, api_key: Option<String>) -> Router {
    api::routes(AppState {
        host,
        api_key: api_key.map(Arc::from),
    })
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    host: Arc<MutatorHost>,
    api_key: Option<String>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, mutators = host.len(), "serving mutator http api");
    axum::serve(listener, router(host, api_key))
        .with_graceful_shutdown(shutdown)
        .await
}
