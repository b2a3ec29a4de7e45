//! modality-mutator-http binary
//!
//! Serves one demo mutator over HTTP so the API can be poked by hand.
//!
//! ```bash
//! modality-mutator-http --addr 127.0.0.1:8080
//! curl localhost:8080/mutator
//! curl -XPOST localhost:8080/mutator/<id>/mutation \
//!      -H 'content-type: application/json' \
//!      -d '{"mutation":"<uuid>","params":{"delay_ms":250}}'
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use modality_client::{Mutator, MutatorError, MutatorHost};
use modality_mutator_http::HttpConfig;
use modality_types::{
    AttrType, AttrVal, DistributionKind, Layer, MutationId, MutatorDescriptor, MutatorId, Operation,
    ParamDescriptor, Scaling, Statefulness,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "modality-mutator-http")]
#[command(about = "Serve a demo mutator over the modality mutator HTTP API")]
struct Args {
    /// TOML config file (addr, api_key)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address, overrides config and environment
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Required value of the mutator_apikey header
    #[arg(long)]
    apikey: Option<String>,

    /// Correlation id for the demo mutator (random when omitted)
    #[arg(long)]
    mutator_id: Option<String>,
}

/// Adds a fixed delay to some imaginary request path while injected.
#[derive(Default)]
struct LatencyMutator {
    delay_ms: AtomicI64,
}

#[async_trait]
impl Mutator for LatencyMutator {
    fn describe(&self) -> MutatorDescriptor {
        MutatorDescriptor::new("demo-latency")
            .with_description("Adds latency to the demo request path")
            .with_layer(Layer::Operational)
            .with_group("demo")
            .with_operation(Operation::Delay)
            .with_statefulness(Statefulness::Transient)
            .with_param(
                ParamDescriptor::new("delay_ms", AttrType::Integer)
                    .with_description("Added delay in milliseconds")
                    .with_range(0i64, 10_000i64)
                    .with_default(100i64)
                    .with_least_effect(0i64)
                    .with_distribution(DistributionKind::Continuous, Some(Scaling::Linear)),
            )
    }

    async fn inject(
        &self,
        mutation: MutationId,
        params: Vec<(String, AttrVal)>,
    ) -> Result<(), MutatorError> {
        let delay = params
            .iter()
            .find(|(k, _)| k == "delay_ms")
            .and_then(|(_, v)| v.as_i64())
            .ok_or_else(|| MutatorError::new("delay_ms missing"))?;
        self.delay_ms.store(delay, Ordering::SeqCst);
        tracing::info!(%mutation, delay_ms = delay, "latency injected");
        Ok(())
    }

    async fn reset(&self) -> Result<(), MutatorError> {
        self.delay_ms.store(0, Ordering::SeqCst);
        tracing::info!("latency cleared");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            HttpConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => HttpConfig::default(),
    }
    .apply_env()?;
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if args.apikey.is_some() {
        config.api_key = args.apikey;
    }

    let mutator_id = match &args.mutator_id {
        Some(s) => MutatorId::parse(s).context("invalid --mutator-id")?,
        None => MutatorId::new(),
    };

    let host = Arc::new(MutatorHost::new());
    host.register(mutator_id, Arc::new(LatencyMutator::default()))?;
    tracing::info!(mutator = %mutator_id, "registered demo mutator");

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;

    modality_mutator_http::serve(listener, host, config.api_key, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    })
    .await?;
    Ok(())
}
