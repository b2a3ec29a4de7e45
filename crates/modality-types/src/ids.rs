//! Typed identifiers for timelines, mutators, mutations, and sessions.
//!
//! All ID types wrap a UUID. They're opaque on the wire (16 raw bytes) and
//! display as standard UUID text for logging. The `short()` form (first 8 hex
//! chars) is for human-facing output only, never used as a lookup key.
//!
//! `TimelineId` additionally supports deterministic derivation from a name
//! via UUIDv5, so a restarted process can resume the same timeline identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A timeline identifier (UUIDv4, or UUIDv5 when derived from a name).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineId(uuid::Uuid);

/// A mutator correlation identifier, chosen by the registrant.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutatorId(uuid::Uuid);

/// A mutation identifier, issued by the mutation service per inject command.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(uuid::Uuid);

/// A mutation-plane participant identifier (one per client connection).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(uuid::Uuid);

/// A transport session identifier. Scopes interned attribute keys.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new random ID (UUIDv4).
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// First 8 hex characters, for log lines and Debug output.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[..8].to_string()
            }

            /// The raw 16 bytes, as the value codec writes them.
            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            pub fn from_bytes(b: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(b))
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(TimelineId, "TimelineId");
impl_typed_id!(MutatorId, "MutatorId");
impl_typed_id!(MutationId, "MutationId");
impl_typed_id!(ParticipantId, "ParticipantId");
impl_typed_id!(SessionId, "SessionId");

// ── Derived timeline ids ────────────────────────────────────────────────────

/// Fixed namespace for deriving deterministic TimelineIds via UUIDv5.
const TIMELINE_NS: uuid::Uuid = uuid::uuid!("3b5e2f1a-9c47-4d0e-8a61-7f2c9e14b0d5");

impl TimelineId {
    /// Derive a stable timeline id from a name.
    ///
    /// The same name always yields the same id, across processes and hosts.
    pub fn from_name(name: &str) -> Self {
        Self(uuid::Uuid::new_v5(&TIMELINE_NS, name.as_bytes()))
    }
}

// ============================================================================
// Tests
// ============================================================================
