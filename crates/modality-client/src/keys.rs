//! Attribute key interning.
//!
//! Key names are declared once per session; the server hands back a small
//! handle which is what every later attribute carries. Handles are tagged
//! with the issuing session's id so a handle from an earlier connection is
//! caught locally instead of silently meaning something else.

use std::collections::HashMap;
use std::fmt;

use modality_types::SessionId;

use crate::error::{Error, Result};
use crate::protocol::{IngestProtocol, IngestRequest, IngestResponse};
use crate::session::Session;

/// Session-scoped handle for a declared key name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrKey {
    session: SessionId,
    handle: u32,
}

impl AttrKey {
    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn session(&self) -> SessionId {
        self.session
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.handle)
    }
}

impl fmt::Debug for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttrKey({}@{})", self.handle, self.session.short())
    }
}

#[derive(Debug, Default)]
pub struct KeyRegistry {
    session: Option<SessionId>,
    by_name: HashMap<String, u32>,
    by_handle: HashMap<u32, String>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, asking the server only the first time it is seen.
    pub async fn declare(
        &mut self,
        session: &mut Session<IngestProtocol>,
        name: &str,
    ) -> Result<AttrKey> {
        if self.session != Some(session.id()) {
            self.bind(session.id());
        }
        if let Some(&handle) = self.by_name.get(name) {
            return Ok(AttrKey {
                session: session.id(),
                handle,
            });
        }
        validate_name(name, session.max_key_len())?;

        let resp = session
            .send_request(&IngestRequest::DeclareKey {
                name: name.to_string(),
            })
            .await?;
        let handle = match resp {
            IngestResponse::KeyDeclared { name: echoed, key } if echoed == name => key,
            IngestResponse::KeyDeclared { name: echoed, .. } => {
                return Err(Error::Protocol(format!(
                    "declared key '{name}' but server answered for '{echoed}'"
                )));
            }
            other => return Err(Error::Protocol(format!("expected KeyDeclared, got {other:?}"))),
        };

        tracing::trace!(session = %session.id(), key = name, handle, "declared key");
        self.by_name.insert(name.to_string(), handle);
        self.by_handle.insert(handle, name.to_string());
        Ok(AttrKey {
            session: session.id(),
            handle,
        })
    }

    /// Wire handle for a key issued by this registry in its current session.
    pub fn resolve(&self, key: AttrKey) -> Result<u32> {
        if self.session == Some(key.session) && self.by_handle.contains_key(&key.handle) {
            Ok(key.handle)
        } else {
            Err(Error::UnknownKey(key))
        }
    }

    pub fn name(&self, key: AttrKey) -> Option<&str> {
        if self.session != Some(key.session) {
            return None;
        }
        self.by_handle.get(&key.handle).map(String::as_str)
    }

    pub fn lookup(&self, name: &str) -> Option<AttrKey> {
        let session = self.session?;
        self.by_name.get(name).map(|&handle| AttrKey { session, handle })
    }

    /// Forget every mapping. Called when the owning session goes away.
    pub fn clear(&mut self) {
        self.session = None;
        self.by_name.clear();
        self.by_handle.clear();
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn bind(&mut self, session: SessionId) {
        self.clear();
        self.session = Some(session);
    }
}

fn validate_name(name: &str, max: usize) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidKeyName("key name is empty".into()));
    }
    if name.len() > max {
        return Err(Error::InvalidKeyName(format!(
            "key name is {} bytes, limit is {max}",
            name.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthToken;
    use crate::config::ClientConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    async fn read_msg(server: &mut DuplexStream) -> Option<IngestRequest> {
        let len = server.read_u32().await.ok()? as usize;
        let mut buf = vec![0u8; len];
        server.read_exact(&mut buf).await.ok()?;
        Some(postcard::from_bytes(&buf).unwrap())
    }

    async fn write_msg(server: &mut DuplexStream, msg: &IngestResponse) {
        let bytes = postcard::to_stdvec(msg).unwrap();
        server.write_u32(bytes.len() as u32).await.unwrap();
        server.write_all(&bytes).await.unwrap();
    }

    /// Accepts auth, hands out sequential handles, counts DeclareKey frames.
    async fn stub(cfg: &ClientConfig, declares: Arc<AtomicUsize>) -> Session<IngestProtocol> {
        let (client, mut server) = tokio::io::duplex(4096);
        tokio::spawn(async move {
            let mut next = 10u32;
            while let Some(msg) = read_msg(&mut server).await {
                match msg {
                    IngestRequest::Auth { .. } => {
                        let ok = IngestResponse::AuthResponse {
                            ok: true,
                            message: None,
                            max_key_len: None,
                        };
                        write_msg(&mut server, &ok).await;
                    }
                    IngestRequest::DeclareKey { name } => {
                        declares.fetch_add(1, Ordering::SeqCst);
                        let reply = IngestResponse::KeyDeclared { name, key: next };
                        write_msg(&mut server, &reply).await;
                        next += 1;
                    }
                    _ => {}
                }
            }
        });
        let mut s = Session::from_stream(client, IngestProtocol, cfg);
        s.authenticate(&AuthToken::from_hex("01").unwrap()).await.unwrap();
        s
    }

    #[tokio::test]
    async fn test_declare_is_idempotent_with_one_round_trip() {
        let declares = Arc::new(AtomicUsize::new(0));
        let mut session = stub(&ClientConfig::default(), declares.clone()).await;
        let mut keys = KeyRegistry::new();

        let a = keys.declare(&mut session, "event.name").await.unwrap();
        let b = keys.declare(&mut session, "event.name").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(declares.load(Ordering::SeqCst), 1);

        let c = keys.declare(&mut session, "event.payload").await.unwrap();
        assert_ne!(a, c);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.name(a), Some("event.name"));
        assert_eq!(keys.lookup("event.payload"), Some(c));
    }

    #[tokio::test]
    async fn test_invalid_names_never_reach_server() {
        let declares = Arc::new(AtomicUsize::new(0));
        let cfg = ClientConfig {
            max_key_len: 4,
            ..Default::default()
        };
        let mut session = stub(&cfg, declares.clone()).await;
        let mut keys = KeyRegistry::new();

        assert!(matches!(keys.declare(&mut session, "").await, Err(Error::InvalidKeyName(_))));
        assert!(matches!(
            keys.declare(&mut session, "toolong").await,
            Err(Error::InvalidKeyName(_))
        ));
        assert_eq!(declares.load(Ordering::SeqCst), 0);
        assert!(keys.declare(&mut session, "ok").await.is_ok());
    }

    #[tokio::test]
    async fn test_keys_from_other_session_are_unknown() {
        let declares = Arc::new(AtomicUsize::new(0));
        let mut first = stub(&ClientConfig::default(), declares.clone()).await;
        let mut keys = KeyRegistry::new();
        let old = keys.declare(&mut first, "k").await.unwrap();
        assert_eq!(keys.resolve(old).unwrap(), old.handle());

        let mut second = stub(&ClientConfig::default(), declares.clone()).await;
        let fresh = keys.declare(&mut second, "k").await.unwrap();
        assert!(matches!(keys.resolve(old), Err(Error::UnknownKey(_))));
        assert!(keys.resolve(fresh).is_ok());
        // Rebinding re-declares rather than reusing the old handle.
        assert_eq!(declares.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_invalidates_everything() {
        let declares = Arc::new(AtomicUsize::new(0));
        let mut session = stub(&ClientConfig::default(), declares).await;
        let mut keys = KeyRegistry::new();
        let k = keys.declare(&mut session, "k").await.unwrap();
        keys.clear();
        assert!(keys.is_empty());
        assert!(matches!(keys.resolve(k), Err(Error::UnknownKey(_))));
    }
}
