//! Wire messages for the ingest and mutation planes.
//!
//! Each frame payload is one postcard-encoded message. Attribute values are
//! carried as Value Codec bytes, never as postcard-encoded `AttrVal`, so the
//! value layout stays independent of the message envelope.
//!
//! Request/response vs fire-and-forget:
//!
//! |----------|---------------------------------|--------------|
//! | Plane    | Request                         | Reply        |
//! |----------|---------------------------------|--------------|
//! | ingest   | Auth                            | AuthResponse |
//! | ingest   | DeclareKey                      | KeyDeclared  |
//! | ingest   | StatusRequest                   | Status       |
//! | ingest   | OpenTimeline, TimelineMetadata, | (none)       |
//! |          | Event, CloseTimeline, Flush     |              |
//! | mutation | Auth                            | AuthOutcome  |
//! | mutation | Poll                            | Commands     |
//! | mutation | AnnounceMutator, RetireMutator, | (none)       |
//! |          | Report                          |              |
//! |----------|---------------------------------|--------------|
//!
//! Either server may answer any request with `Unauthenticated`.

use std::fmt::Debug;

use modality_types::codec::{self, CodecError};
use modality_types::{AttrVal, MutationId, MutatorId, ParticipantId, TimelineId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::AuthToken;
use crate::constants::MUTATION_PROTOCOL_VERSION;
use crate::endpoint::Plane;

/// An attribute as sent: interned key handle plus encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAttr {
    pub key: u32,
    pub value: Vec<u8>,
}

/// A named parameter or descriptor field: name plus encoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Vec<u8>,
}

impl NamedValue {
    pub fn encode(name: impl Into<String>, val: &AttrVal) -> Self {
        Self {
            name: name.into(),
            value: codec::encode(val),
        }
    }

    pub fn decode(&self) -> Result<(String, AttrVal), CodecError> {
        Ok((self.name.clone(), codec::decode(&self.value)?))
    }
}

pub fn encode_named<'a, I>(items: I) -> Vec<NamedValue>
where
    I: IntoIterator<Item = &'a (String, AttrVal)>,
{
    items.into_iter().map(|(n, v)| NamedValue::encode(n.clone(), v)).collect()
}

pub fn decode_named(items: &[NamedValue]) -> Result<Vec<(String, AttrVal)>, CodecError> {
    items.iter().map(NamedValue::decode).collect()
}

// ============================================================================
// Event ordering
// ============================================================================

/// Big-endian with leading zero bytes stripped; zero encodes as empty.
pub fn encode_ordering(ordering: u128) -> Vec<u8> {
    let bytes = ordering.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

pub fn decode_ordering(bytes: &[u8]) -> Option<u128> {
    if bytes.len() > 16 {
        return None;
    }
    let mut buf = [0u8; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Some(u128::from_be_bytes(buf))
}

// ============================================================================
// Ingest plane
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IngestRequest {
    Auth { token: Vec<u8> },
    DeclareKey { name: String },
    OpenTimeline { id: TimelineId },
    TimelineMetadata { attrs: Vec<WireAttr> },
    Event {
        ordering: Vec<u8>,
        attrs: Vec<WireAttr>,
    },
    CloseTimeline,
    Flush,
    StatusRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IngestResponse {
    AuthResponse {
        ok: bool,
        message: Option<String>,
        /// Server-imposed key name limit, if tighter than the client's.
        max_key_len: Option<u32>,
    },
    KeyDeclared { name: String, key: u32 },
    Status(IngestStatus),
    Unauthenticated,
}

/// Server-side counters for this connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStatus {
    pub current_timeline: Option<TimelineId>,
    pub events_received: u64,
    pub events_written: u64,
    pub events_pending: u64,
    pub error_count: u64,
}

// ============================================================================
// Mutation plane
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MutationRequest {
    Auth {
        participant_id: ParticipantId,
        version: u32,
        token: Vec<u8>,
    },
    AnnounceMutator {
        mutator_id: MutatorId,
        attrs: Vec<NamedValue>,
    },
    RetireMutator { mutator_id: MutatorId },
    /// Ask for pending commands, carrying outcomes from earlier dispatch.
    Poll { results: Vec<CommandResult> },
    /// Deliver outcomes without asking for commands.
    Report { results: Vec<CommandResult> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MutationResponse {
    AuthOutcome { ok: bool, message: Option<String> },
    Commands {
        commands: Vec<PendingCommand>,
        /// Server lost its view of our mutators; announce them all again.
        reannounce: bool,
    },
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PendingCommand {
    Inject {
        mutator_id: MutatorId,
        mutation_id: MutationId,
        params: Vec<NamedValue>,
    },
    Reset { mutator_id: MutatorId },
    ResetAll,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub mutator_id: MutatorId,
    pub mutation_id: Option<MutationId>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Injected,
    Reset,
    AlreadyInjected { active: MutationId },
    UnknownMutator,
    InvalidParams(String),
    Failed(String),
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Injected | Outcome::Reset)
    }
}

// ============================================================================
// Per-plane session glue
// ============================================================================

/// What a session learned from the server's auth reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthReply {
    Accepted { max_key_len: Option<usize> },
    Rejected(String),
    Unexpected(String),
}

/// Plane-specific message types and handshake shape.
pub trait Protocol: Send + 'static {
    type Request: Serialize + Debug + Send + Sync;
    type Response: DeserializeOwned + Debug + Send;

    const PLANE: Plane;

    fn auth_request(&self, token: &AuthToken) -> Self::Request;

    fn auth_reply(resp: Self::Response) -> AuthReply;

    fn is_unauthenticated(resp: &Self::Response) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestProtocol;

impl Protocol for IngestProtocol {
    type Request = IngestRequest;
    type Response = IngestResponse;

    const PLANE: Plane = Plane::Ingest;

    fn auth_request(&self, token: &AuthToken) -> IngestRequest {
        IngestRequest::Auth {
            token: token.as_bytes().to_vec(),
        }
    }

    fn auth_reply(resp: IngestResponse) -> AuthReply {
        match resp {
            IngestResponse::AuthResponse {
                ok: true,
                max_key_len,
                ..
            } => AuthReply::Accepted {
                max_key_len: max_key_len.map(|n| n as usize),
            },
            IngestResponse::AuthResponse {
                ok: false,
                message,
                ..
            } => {
                AuthReply::Rejected(message.unwrap_or_else(|| "token rejected".into()))
            }
            IngestResponse::Unauthenticated => AuthReply::Rejected("unauthenticated".into()),
            other => AuthReply::Unexpected(format!("{other:?}")),
        }
    }

    fn is_unauthenticated(resp: &IngestResponse) -> bool {
        matches!(resp, IngestResponse::Unauthenticated)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MutationProtocol {
    pub participant_id: ParticipantId,
}

impl MutationProtocol {
    pub fn new(participant_id: ParticipantId) -> Self {
        Self { participant_id }
    }
}

impl Protocol for MutationProtocol {
    type Request = MutationRequest;
    type Response = MutationResponse;

    const PLANE: Plane = Plane::Mutation;

    fn auth_request(&self, token: &AuthToken) -> MutationRequest {
        MutationRequest::Auth {
            participant_id: self.participant_id,
            version: MUTATION_PROTOCOL_VERSION,
            token: token.as_bytes().to_vec(),
        }
    }

    fn auth_reply(resp: MutationResponse) -> AuthReply {
        match resp {
            MutationResponse::AuthOutcome { ok: true, .. } => {
                AuthReply::Accepted { max_key_len: None }
            }
            MutationResponse::AuthOutcome { ok: false, message } => {
                AuthReply::Rejected(message.unwrap_or_else(|| "token rejected".into()))
            }
            MutationResponse::Unauthenticated => AuthReply::Rejected("unauthenticated".into()),
            other => AuthReply::Unexpected(format!("{other:?}")),
        }
    }

    fn is_unauthenticated(resp: &MutationResponse) -> bool {
        matches!(resp, MutationResponse::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Ordering ────────────────────────────────────────────────────────

    #[test]
    fn test_ordering_is_compact() {
        assert_eq!(encode_ordering(0), Vec::<u8>::new());
        assert_eq!(encode_ordering(1), vec![1]);
        assert_eq!(encode_ordering(0x0102), vec![1, 2]);
        assert_eq!(encode_ordering(u128::MAX).len(), 16);
    }

    #[test]
    fn test_ordering_decode() {
        for v in [0u128, 1, 255, 256, u64::MAX as u128 + 7, u128::MAX] {
            assert_eq!(decode_ordering(&encode_ordering(v)), Some(v));
        }
        assert_eq!(decode_ordering(&[0u8; 17]), None);
    }

    #[test]
    fn test_compact_ordering_preserves_numeric_order() {
        // Longer encodings are always larger values.
        let a = encode_ordering(255);
        let b = encode_ordering(256);
        assert!(a.len() < b.len());
    }

    // ── Envelope ────────────────────────────────────────────────────────

    #[test]
    fn test_postcard_envelope_roundtrip() {
        let req = IngestRequest::Event {
            ordering: encode_ordering(3),
            attrs: vec![WireAttr {
                key: 7,
                value: codec::encode(&AttrVal::Integer(42)),
            }],
        };
        let bytes = postcard::to_stdvec(&req).unwrap();
        assert_eq!(postcard::from_bytes::<IngestRequest>(&bytes).unwrap(), req);

        let resp = MutationResponse::Commands {
            commands: vec![
                PendingCommand::Inject {
                    mutator_id: MutatorId::new(),
                    mutation_id: MutationId::new(),
                    params: vec![NamedValue::encode("my-param", &AttrVal::Integer(55))],
                },
                PendingCommand::ResetAll,
            ],
            reannounce: false,
        };
        let bytes = postcard::to_stdvec(&resp).unwrap();
        assert_eq!(postcard::from_bytes::<MutationResponse>(&bytes).unwrap(), resp);
    }

    #[test]
    fn test_named_value_decode() {
        let nv = NamedValue::encode("p", &AttrVal::from("x"));
        assert_eq!(nv.decode().unwrap(), ("p".to_string(), AttrVal::from("x")));
        let bad = NamedValue {
            name: "p".into(),
            value: vec![0xee],
        };
        assert!(bad.decode().is_err());
    }

    // ── Auth replies ────────────────────────────────────────────────────

    #[test]
    fn test_auth_reply_mapping() {
        let ok = IngestResponse::AuthResponse {
            ok: true,
            message: None,
            max_key_len: Some(64),
        };
        assert_eq!(
            IngestProtocol::auth_reply(ok),
            AuthReply::Accepted {
                max_key_len: Some(64)
            }
        );

        let no = MutationResponse::AuthOutcome {
            ok: false,
            message: Some("expired".into()),
        };
        assert_eq!(MutationProtocol::auth_reply(no), AuthReply::Rejected("expired".into()));

        let odd = IngestResponse::Status(IngestStatus::default());
        assert!(matches!(IngestProtocol::auth_reply(odd), AuthReply::Unexpected(_)));
    }
}
