//! In-process stub servers for both planes.
//!
//! Each stub decodes every frame it receives, records it, and answers the way
//! a real server would for the happy path. Tests inspect the recording.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use modality_client::frame::FrameCodec;
use modality_client::protocol::{
    IngestRequest, IngestResponse, IngestStatus, MutationRequest, MutationResponse, PendingCommand,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

pub const GOOD_TOKEN: &str = "c0ffee";

pub fn good_token() -> modality_client::AuthToken {
    modality_client::AuthToken::from_hex(GOOD_TOKEN).unwrap()
}

pub fn bad_token() -> modality_client::AuthToken {
    modality_client::AuthToken::from_hex("baad").unwrap()
}

struct Wire<S> {
    framed: Framed<S, FrameCodec>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Wire<S> {
    fn new(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec::default()),
        }
    }

    async fn recv<T: DeserializeOwned>(&mut self) -> Option<T> {
        let frame = self.framed.next().await?.ok()?;
        Some(postcard::from_bytes(&frame).unwrap())
    }

    async fn send<T: Serialize>(&mut self, msg: &T) {
        let bytes = postcard::to_stdvec(msg).unwrap();
        let _ = self.framed.send(Bytes::from(bytes)).await;
    }
}

// ============================================================================
// Ingest
// ============================================================================

#[derive(Clone, Default)]
pub struct IngestRecording {
    inner: Arc<Mutex<Vec<IngestRequest>>>,
}

impl IngestRecording {
    pub fn all(&self) -> Vec<IngestRequest> {
        self.inner.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&IngestRequest) -> bool) -> usize {
        self.inner.lock().iter().filter(|m| pred(m)).count()
    }
}

/// Serve the ingest plane on `stream` until the client hangs up.
pub fn serve_ingest<S>(stream: S) -> IngestRecording
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let recording = IngestRecording::default();
    let rec = recording.clone();
    tokio::spawn(async move {
        let mut wire = Wire::new(stream);
        let mut authed = false;
        let mut next_key = 100u32;
        let mut status = IngestStatus::default();
        while let Some(msg) = wire.recv::<IngestRequest>().await {
            rec.inner.lock().push(msg.clone());
            match msg {
                IngestRequest::Auth { token } => {
                    authed = hex::encode(&token) == GOOD_TOKEN;
                    let reply = IngestResponse::AuthResponse {
                        ok: authed,
                        message: (!authed).then(|| "unknown token".to_string()),
                        max_key_len: None,
                    };
                    wire.send(&reply).await;
                }
                _ if !authed => wire.send(&IngestResponse::Unauthenticated).await,
                IngestRequest::DeclareKey { name } => {
                    wire.send(&IngestResponse::KeyDeclared {
                        name,
                        key: next_key,
                    })
                    .await;
                    next_key += 1;
                }
                IngestRequest::OpenTimeline { id } => status.current_timeline = Some(id),
                IngestRequest::CloseTimeline => status.current_timeline = None,
                IngestRequest::Event { .. } => {
                    status.events_received += 1;
                    status.events_pending += 1;
                }
                IngestRequest::Flush => {
                    status.events_written += status.events_pending;
                    status.events_pending = 0;
                }
                IngestRequest::StatusRequest => {
                    wire.send(&IngestResponse::Status(status.clone())).await
                }
                IngestRequest::TimelineMetadata { .. } => {}
            }
        }
    });
    recording
}

// ============================================================================
// Mutation
// ============================================================================

#[derive(Clone, Default)]
pub struct MutationRecording {
    inner: Arc<Mutex<Vec<MutationRequest>>>,
}

impl MutationRecording {
    pub fn all(&self) -> Vec<MutationRequest> {
        self.inner.lock().clone()
    }

    pub fn announcements(&self) -> usize {
        self.inner
            .lock()
            .iter()
            .filter(|m| matches!(m, MutationRequest::AnnounceMutator { .. }))
            .count()
    }

    /// Results carried by every Poll and Report so far, in order.
    pub fn reported(&self) -> Vec<modality_client::CommandResult> {
        self.inner
            .lock()
            .iter()
            .flat_map(|m| match m {
                MutationRequest::Poll { results } | MutationRequest::Report { results } => {
                    results.clone()
                }
                _ => Vec::new(),
            })
            .collect()
    }
}

/// One scripted poll reply.
#[derive(Default)]
pub struct Script {
    pub commands: Vec<PendingCommand>,
    pub reannounce: bool,
    /// Stop reading from the client once this reply is sent.
    pub stall: bool,
}

impl From<Vec<PendingCommand>> for Script {
    fn from(commands: Vec<PendingCommand>) -> Self {
        Self {
            commands,
            ..Default::default()
        }
    }
}

/// Serve the mutation plane. Each Poll takes the next queued script, or
/// answers with no commands when none is queued.
pub fn serve_mutation<S>(stream: S) -> (MutationRecording, mpsc::UnboundedSender<Script>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let recording = MutationRecording::default();
    let rec = recording.clone();
    let (tx, mut rx) = mpsc::unbounded_channel::<Script>();
    tokio::spawn(async move {
        let mut wire = Wire::new(stream);
        let mut authed = false;
        while let Some(msg) = wire.recv::<MutationRequest>().await {
            rec.inner.lock().push(msg.clone());
            match msg {
                MutationRequest::Auth { token, version, .. } => {
                    authed = hex::encode(&token) == GOOD_TOKEN && version == 1;
                    let reply = MutationResponse::AuthOutcome {
                        ok: authed,
                        message: (!authed).then(|| "unknown token".to_string()),
                    };
                    wire.send(&reply).await;
                }
                MutationRequest::Poll { .. } if !authed => {
                    wire.send(&MutationResponse::Unauthenticated).await
                }
                MutationRequest::Poll { .. } => {
                    let script = rx.try_recv().unwrap_or_default();
                    let reply = MutationResponse::Commands {
                        commands: script.commands,
                        reannounce: script.reannounce,
                    };
                    wire.send(&reply).await;
                    if script.stall {
                        // Hold the stream open without draining it.
                        std::future::pending::<()>().await;
                    }
                }
                _ => {}
            }
        }
    });
    (recording, tx)
}
