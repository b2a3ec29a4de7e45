//! Ingest client: timeline lifecycle over one authenticated session.
//!
//! ```text
//! Disconnected ─► Connected ─► Authenticated ◄──────────────┐
//!                                   │ open_timeline          │ close_timeline
//!                                   ▼                        │
//!                              TimelineOpen ── metadata / event
//! ```
//!
//! State checks happen before anything is written: a misplaced call costs no
//! round-trip and leaves the session untouched. Attribute keys are resolved
//! against this session's registry up front, so a batch is either sent whole
//! or not at all.

use modality_types::{AttrVal, TimelineId, codec};

use crate::auth::AuthToken;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::keys::{AttrKey, KeyRegistry};
use crate::protocol::{
    IngestProtocol, IngestRequest, IngestResponse, IngestStatus, WireAttr, encode_ordering,
};
use crate::session::{Session, SessionState, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Disconnected,
    Connected,
    Authenticated,
    TimelineOpen(TimelineId),
}

impl IngestState {
    fn describe(&self) -> &'static str {
        match self {
            IngestState::Disconnected => "disconnected",
            IngestState::Connected => "not authenticated",
            IngestState::Authenticated => "no timeline is open",
            IngestState::TimelineOpen(_) => "a timeline is open",
        }
    }
}

#[derive(Debug)]
pub struct IngestClient {
    session: Session<IngestProtocol>,
    keys: KeyRegistry,
    open: Option<TimelineId>,
}

impl IngestClient {
    /// Connect to the configured ingest endpoint. Call `authenticate` next.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let endpoint = config.ingest_endpoint()?;
        let session = Session::connect(&endpoint, IngestProtocol, config).await?;
        Ok(Self::from_session(session))
    }

    pub fn from_stream<S: Transport + 'static>(stream: S, config: &ClientConfig) -> Self {
        Self::from_session(Session::from_stream(stream, IngestProtocol, config))
    }

    pub fn from_session(session: Session<IngestProtocol>) -> Self {
        Self {
            session,
            keys: KeyRegistry::new(),
            open: None,
        }
    }

    pub async fn authenticate(&mut self, token: &AuthToken) -> Result<()> {
        let res = self.session.authenticate(token).await;
        self.sync();
        res
    }

    pub fn state(&self) -> IngestState {
        match self.session.state() {
            SessionState::Closed => IngestState::Disconnected,
            SessionState::Connected | SessionState::Rejected => IngestState::Connected,
            SessionState::Authenticated => match self.open {
                Some(id) => IngestState::TimelineOpen(id),
                None => IngestState::Authenticated,
            },
        }
    }

    pub fn session(&self) -> &Session<IngestProtocol> {
        &self.session
    }

    pub fn current_timeline(&self) -> Option<TimelineId> {
        self.open
    }

    pub async fn declare_attr_key(&mut self, name: &str) -> Result<AttrKey> {
        let res = self.keys.declare(&mut self.session, name).await;
        self.sync();
        res
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    pub async fn open_timeline(&mut self, id: TimelineId) -> Result<()> {
        match self.state() {
            IngestState::Authenticated => {}
            IngestState::TimelineOpen(_) => {
                // One at a time, and the same id counts too.
                return Err(Error::TimelineAlreadyOpen(self.open.unwrap_or(id)));
            }
            other => return Err(self.state_error("open_timeline", other)),
        }
        self.send(IngestRequest::OpenTimeline { id }).await?;
        self.open = Some(id);
        tracing::debug!(session = %self.session.id(), timeline = %id, "timeline opened");
        Ok(())
    }

    pub async fn timeline_metadata(&mut self, attrs: &[(AttrKey, AttrVal)]) -> Result<()> {
        self.require_open("timeline_metadata")?;
        let attrs = self.wire_attrs(attrs)?;
        self.send(IngestRequest::TimelineMetadata { attrs }).await
    }

    /// Append one event. `ordering` is the producer's nonce for this event.
    pub async fn event(&mut self, ordering: u128, attrs: &[(AttrKey, AttrVal)]) -> Result<()> {
        self.require_open("event")?;
        let attrs = self.wire_attrs(attrs)?;
        self.send(IngestRequest::Event {
            ordering: encode_ordering(ordering),
            attrs,
        })
        .await
    }

    pub async fn close_timeline(&mut self) -> Result<()> {
        let id = self.require_open("close_timeline")?;
        self.send(IngestRequest::CloseTimeline).await?;
        self.open = None;
        tracing::debug!(session = %self.session.id(), timeline = %id, "timeline closed");
        Ok(())
    }

    /// Ask the server to persist everything received so far.
    pub async fn flush(&mut self) -> Result<()> {
        self.send(IngestRequest::Flush).await
    }

    pub async fn status(&mut self) -> Result<IngestStatus> {
        let res = self.session.send_request(&IngestRequest::StatusRequest).await;
        self.sync();
        match res? {
            IngestResponse::Status(status) => Ok(status),
            other => Err(Error::Protocol(format!("expected Status, got {other:?}"))),
        }
    }

    pub async fn close(mut self) {
        self.session.close().await;
        self.keys.clear();
    }

    fn require_open(&self, op: &'static str) -> Result<TimelineId> {
        match self.state() {
            IngestState::TimelineOpen(id) => Ok(id),
            other => Err(self.state_error(op, other)),
        }
    }

    fn state_error(&self, op: &'static str, state: IngestState) -> Error {
        match state {
            IngestState::Disconnected => Error::Disconnected,
            IngestState::Connected => Error::NotAuthenticated,
            _ => Error::InvalidState {
                op,
                state: state.describe(),
            },
        }
    }

    fn wire_attrs(&self, attrs: &[(AttrKey, AttrVal)]) -> Result<Vec<WireAttr>> {
        attrs
            .iter()
            .map(|(key, val)| {
                Ok(WireAttr {
                    key: self.keys.resolve(*key)?,
                    value: codec::encode(val),
                })
            })
            .collect()
    }

    async fn send(&mut self, req: IngestRequest) -> Result<()> {
        let res = self.session.send_fire_and_forget(&req).await;
        self.sync();
        res
    }

    /// Drop per-session state once the session is gone.
    fn sync(&mut self) {
        if self.session.state() != SessionState::Authenticated {
            self.open = None;
        }
        if self.session.state() == SessionState::Closed {
            self.keys.clear();
        }
    }
}
