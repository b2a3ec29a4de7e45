//! Shared data model for modality clients.
//!
//! This crate is the leaf of the workspace: typed ids, attribute values, the
//! value codec, and mutator descriptors. It does no I/O.
//!
//! # Key Types
//!
//! |-----------------------|-----------------------------------------------|
//! | Type                  | Purpose                                       |
//! |-----------------------|-----------------------------------------------|
//! | [`AttrVal`]           | Tagged attribute value (8 variants)           |
//! | [`BigInt`]            | 128-bit unsigned as (lsb, msb) halves         |
//! | [`LogicalTime`]       | 1 to 4 segment causal time token              |
//! | [`TimelineId`]        | One causal stream of events                   |
//! | [`MutatorId`]         | Registrant-chosen mutator correlation id      |
//! | [`MutationId`]        | Server-issued id for one inject               |
//! | [`MutatorDescriptor`] | Static mutator metadata + flat attribute form |
//! |-----------------------|-----------------------------------------------|

pub mod attr;
pub mod codec;
pub mod descriptor;
pub mod ids;

pub use attr::{AttrType, AttrVal, BigInt, LogicalTime, Nanoseconds};
pub use codec::{CodecError, MalformedReason, decode, decode_prefix, encode};
pub use descriptor::{
    DescriptorError, DistributionKind, Layer, MutatorDescriptor, Operation, ParamDescriptor,
    ParamError, Scaling, Statefulness,
};
pub use ids::{MutationId, MutatorId, ParticipantId, SessionId, TimelineId};
