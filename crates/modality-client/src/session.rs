//! Transport session: one connection, framed, authenticated once.
//!
//! ```text
//!   connect ──► Connected ──authenticate──► Authenticated ──close──► Closed
//!                   │                            │
//!                   └──rejected──► Rejected      └──EOF / io error / bad frame──► Closed
//! ```
//!
//! Every protocol operation before a successful `authenticate` fails with
//! `NotAuthenticated` without touching the socket. A rejected session stays
//! rejected; the caller reconnects. Nothing here reconnects or retries.
//!
//! Each round-trip runs under the configured timeout. A request whose reply
//! times out leaves that reply owed by the server; the session remembers how
//! many replies are owed and discards that many frames before reading the
//! next reply, so a read timeout does not desynchronize request/response
//! pairing. A write that times out is different: the frame may be half sent,
//! so the session closes.

use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use modality_types::SessionId;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::auth::AuthToken;
use crate::config::ClientConfig;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::frame::{FrameCodec, FrameError};
use crate::protocol::{AuthReply, Protocol};
use crate::tls;

/// Any bidirectional byte stream a session can run over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

type BoxedTransport = Box<dyn Transport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Authenticated,
    /// Authentication failed; terminal.
    Rejected,
    /// Closed locally or by the peer; terminal.
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
            SessionState::Rejected => "rejected",
            SessionState::Closed => "closed",
        }
    }
}

pub struct Session<P: Protocol> {
    id: SessionId,
    protocol: P,
    framed: Option<Framed<BoxedTransport, FrameCodec>>,
    state: SessionState,
    timeout: Duration,
    max_key_len: usize,
    owed_replies: usize,
}

impl<P: Protocol> Session<P> {
    /// Open a TCP connection (wrapped in TLS when the endpoint is secure).
    pub async fn connect(endpoint: &Endpoint, protocol: P, config: &ClientConfig) -> Result<Self> {
        if endpoint.plane() != P::PLANE {
            return Err(Error::Protocol(format!(
                "endpoint {endpoint} does not address the {:?} plane",
                P::PLANE
            )));
        }
        let addr = endpoint.socket_addr();
        let tcp = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::ConnectTimeout(addr.clone()))?
            .map_err(|source| Error::Connect {
                addr: addr.clone(),
                source,
            })?;
        tcp.set_nodelay(true)
            .map_err(|source| Error::Connect {
                addr: addr.clone(),
                source,
            })?;

        let stream: BoxedTransport = if endpoint.is_secure() {
            let tls_config = tls::client_config(config.allow_insecure_tls)?;
            let tls = tokio::time::timeout(
                config.connect_timeout,
                tls::connect(tls_config, endpoint.host(), tcp),
            )
            .await
            .map_err(|_| Error::ConnectTimeout(addr.clone()))??;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        tracing::debug!(endpoint = %endpoint, secure = endpoint.is_secure(), "connected");
        Ok(Self::from_stream(stream, protocol, config))
    }

    /// Run a session over an already-connected stream (in-memory pipes in tests).
    pub fn from_stream<S>(stream: S, protocol: P, config: &ClientConfig) -> Self
    where
        S: Transport + 'static,
    {
        let boxed: BoxedTransport = Box::new(stream);
        Self {
            id: SessionId::new(),
            protocol,
            framed: Some(Framed::new(boxed, FrameCodec::new(config.max_frame_len))),
            state: SessionState::Connected,
            timeout: config.timeout,
            max_key_len: config.max_key_len,
            owed_replies: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Effective key-name limit: the client's, lowered by the server if it asked.
    pub fn max_key_len(&self) -> usize {
        self.max_key_len
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Present the token. Valid once, right after connect.
    pub async fn authenticate(&mut self, token: &AuthToken) -> Result<()> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Authenticated => {
                return Err(Error::InvalidState {
                    op: "authenticate",
                    state: "authenticated",
                });
            }
            SessionState::Rejected => return Err(Error::NotAuthenticated),
            SessionState::Closed => return Err(Error::Disconnected),
        }

        let req = self.protocol.auth_request(token);
        let resp = self.round_trip(&req).await?;
        match P::auth_reply(resp) {
            AuthReply::Accepted { max_key_len } => {
                if let Some(n) = max_key_len {
                    self.max_key_len = self.max_key_len.min(n);
                }
                self.state = SessionState::Authenticated;
                tracing::debug!(session = %self.id, "authenticated");
                Ok(())
            }
            AuthReply::Rejected(message) => {
                self.state = SessionState::Rejected;
                tracing::debug!(session = %self.id, %message, "authentication rejected");
                Err(Error::Auth(message))
            }
            AuthReply::Unexpected(what) => {
                self.shutdown();
                Err(Error::Protocol(format!("expected auth reply, got {what}")))
            }
        }
    }

    /// Send and wait for the matching reply.
    pub async fn send_request(&mut self, req: &P::Request) -> Result<P::Response> {
        self.ensure_authenticated()?;
        let resp = self.round_trip(req).await?;
        if P::is_unauthenticated(&resp) {
            self.state = SessionState::Rejected;
            return Err(Error::NotAuthenticated);
        }
        Ok(resp)
    }

    /// Send without expecting a reply.
    pub async fn send_fire_and_forget(&mut self, req: &P::Request) -> Result<()> {
        self.ensure_authenticated()?;
        self.write(req).await
    }

    /// Flush and drop the connection. Any later call fails with `Disconnected`.
    pub async fn close(&mut self) {
        if let Some(mut framed) = self.framed.take() {
            match tokio::time::timeout(self.timeout, framed.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(session = %self.id, error = %e, "close flush failed"),
                Err(_) => tracing::debug!(session = %self.id, "close flush timed out"),
            }
        }
        self.state = SessionState::Closed;
    }

    fn ensure_authenticated(&self) -> Result<()> {
        match self.state {
            SessionState::Authenticated => Ok(()),
            SessionState::Connected | SessionState::Rejected => Err(Error::NotAuthenticated),
            SessionState::Closed => Err(Error::Disconnected),
        }
    }

    fn shutdown(&mut self) {
        self.framed = None;
        self.state = SessionState::Closed;
    }

    async fn round_trip(&mut self, req: &P::Request) -> Result<P::Response> {
        self.write(req).await?;
        self.owed_replies += 1;
        while self.owed_replies > 1 {
            let stale = self.read_frame().await?;
            self.owed_replies -= 1;
            tracing::trace!(session = %self.id, bytes = stale.len(), "discarded late reply");
        }
        let frame = self.read_frame().await?;
        self.owed_replies -= 1;
        postcard::from_bytes(&frame).map_err(|e| {
            self.shutdown();
            Error::MalformedFrame(e.to_string())
        })
    }

    async fn write(&mut self, req: &P::Request) -> Result<()> {
        let payload = postcard::to_stdvec(req).map_err(|e| Error::Protocol(e.to_string()))?;
        tracing::trace!(session = %self.id, ?req, "send");
        let timeout = self.timeout;
        let framed = self.framed.as_mut().ok_or(Error::Disconnected)?;
        match tokio::time::timeout(timeout, framed.send(Bytes::from(payload))).await {
            Err(_) => {
                // Part of the frame may already be buffered or on the wire.
                tracing::debug!(session = %self.id, "write stalled");
                self.shutdown();
                Err(Error::WriteTimeout(timeout))
            }
            Ok(Ok(())) => Ok(()),
            Ok(Err(FrameError::FrameTooLarge { size, max })) => {
                // Nothing was written; the connection is still in sync.
                Err(Error::FrameTooLarge { size, max })
            }
            Ok(Err(FrameError::Io(e))) => {
                tracing::debug!(session = %self.id, error = %e, "write failed");
                self.shutdown();
                Err(Error::Disconnected)
            }
        }
    }

    async fn read_frame(&mut self) -> Result<bytes::BytesMut> {
        let timeout = self.timeout;
        let framed = self.framed.as_mut().ok_or(Error::Disconnected)?;
        match tokio::time::timeout(timeout, framed.next()).await {
            Err(_) => Err(Error::Timeout(timeout)),
            Ok(Some(Ok(frame))) => Ok(frame),
            Ok(Some(Err(FrameError::FrameTooLarge { size, max }))) => {
                tracing::warn!(session = %self.id, size, max, "inbound frame too large");
                self.shutdown();
                Err(Error::FrameTooLarge { size, max })
            }
            Ok(Some(Err(FrameError::Io(e)))) => {
                tracing::debug!(session = %self.id, error = %e, "read failed");
                self.shutdown();
                Err(Error::Disconnected)
            }
            Ok(None) => {
                self.shutdown();
                Err(Error::Disconnected)
            }
        }
    }
}

impl<P: Protocol> std::fmt::Debug for Session<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("plane", &P::PLANE)
            .field("state", &self.state)
            .finish()
    }
}
