//! Value codec: `AttrVal` to and from its wire bytes.
//!
//! Every value is a one-byte tag followed by its payload. All integers are
//! big-endian.
//!
//! |------|--------------|-------------------------------------------|
//! | Tag  | Variant      | Payload                                   |
//! |------|--------------|-------------------------------------------|
//! | 0x01 | TimelineId   | 16 bytes                                  |
//! | 0x02 | String       | u32 length, then that many UTF-8 bytes    |
//! | 0x03 | Integer      | 8 bytes, two's complement                 |
//! | 0x04 | BigInt       | lsb: 8 bytes, msb: 8 bytes                |
//! | 0x05 | Float        | 8 bytes, IEEE-754 binary64                |
//! | 0x06 | Bool         | 1 byte, 0 or 1                            |
//! | 0x07 | Timestamp    | 8 bytes, unsigned nanoseconds             |
//! | 0x08 | LogicalTime  | 1 byte arity (1..=4), arity × 8 bytes     |
//! |------|--------------|-------------------------------------------|
//!
//! Encoding is pure and total. A string longer than [`MAX_STRING_LEN`] bytes
//! has no length prefix, so only its first `MAX_STRING_LEN` bytes (cut back to
//! a char boundary) are encoded. Decoding rejects truncated input, unknown
//! tags, invalid arity, non-UTF-8 strings, and (for [`decode`]) trailing bytes.

use crate::attr::{AttrVal, BigInt, LogicalTime, Nanoseconds};
use crate::ids::TimelineId;

pub const TAG_TIMELINE_ID: u8 = 0x01;
pub const TAG_STRING: u8 = 0x02;
pub const TAG_INTEGER: u8 = 0x03;
pub const TAG_BIGINT: u8 = 0x04;
pub const TAG_FLOAT: u8 = 0x05;
pub const TAG_BOOL: u8 = 0x06;
pub const TAG_TIMESTAMP: u8 = 0x07;
pub const TAG_LOGICAL_TIME: u8 = 0x08;

/// Longest string payload the u32 length prefix can describe.
pub const MAX_STRING_LEN: usize = u32::MAX as usize;

/// Value decoding failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("malformed value: {0}")]
    MalformedValue(MalformedReason),
}

/// Why a value failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedReason {
    #[error("empty input")]
    Empty,
    #[error("unknown tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("truncated: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("logical time arity {0} outside 1..=4")]
    BadArity(u8),
    #[error("bool byte {0} is neither 0 nor 1")]
    BadBool(u8),
    #[error("string is not valid utf-8")]
    BadUtf8,
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

impl From<MalformedReason> for CodecError {
    fn from(r: MalformedReason) -> Self {
        CodecError::MalformedValue(r)
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Encode a value into a fresh buffer.
pub fn encode(val: &AttrVal) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(val));
    encode_into(val, &mut out);
    out
}

/// Append the encoding of `val` to `out`.
pub fn encode_into(val: &AttrVal, out: &mut Vec<u8>) {
    match val {
        AttrVal::TimelineId(id) => {
            out.push(TAG_TIMELINE_ID);
            out.extend_from_slice(id.as_bytes());
        }
        AttrVal::String(s) => {
            let s = clamp_str(s, MAX_STRING_LEN);
            let len = u32::try_from(s.len()).unwrap_or(u32::MAX);
            out.push(TAG_STRING);
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        AttrVal::Integer(i) => {
            out.push(TAG_INTEGER);
            out.extend_from_slice(&i.to_be_bytes());
        }
        AttrVal::BigInt(b) => {
            out.push(TAG_BIGINT);
            out.extend_from_slice(&b.lsb().to_be_bytes());
            out.extend_from_slice(&b.msb().to_be_bytes());
        }
        AttrVal::Float(f) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        AttrVal::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        AttrVal::Timestamp(ns) => {
            out.push(TAG_TIMESTAMP);
            out.extend_from_slice(&ns.get().to_be_bytes());
        }
        AttrVal::LogicalTime(lt) => {
            out.push(TAG_LOGICAL_TIME);
            out.push(lt.arity());
            for seg in lt.segments() {
                out.extend_from_slice(&seg.to_be_bytes());
            }
        }
    }
}

/// Longest prefix of `s` no more than `max` bytes that ends on a char boundary.
fn clamp_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Exact number of bytes [`encode`] produces for `val`.
pub fn encoded_len(val: &AttrVal) -> usize {
    1 + match val {
        AttrVal::TimelineId(_) | AttrVal::BigInt(_) => 16,
        AttrVal::String(s) => 4 + clamp_str(s, MAX_STRING_LEN).len(),
        AttrVal::Integer(_) | AttrVal::Float(_) | AttrVal::Timestamp(_) => 8,
        AttrVal::Bool(_) => 1,
        AttrVal::LogicalTime(lt) => 1 + 8 * lt.segments().len(),
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Decode exactly one value; the input must contain nothing else.
pub fn decode(bytes: &[u8]) -> Result<AttrVal, CodecError> {
    let (val, used) = decode_prefix(bytes)?;
    if used != bytes.len() {
        return Err(MalformedReason::TrailingBytes(bytes.len() - used).into());
    }
    Ok(val)
}

/// Decode one value from the front of `bytes`, returning it and the number
/// of bytes consumed.
pub fn decode_prefix(bytes: &[u8]) -> Result<(AttrVal, usize), CodecError> {
    let (&tag, body) = bytes.split_first().ok_or(MalformedReason::Empty)?;
    let mut r = Reader { buf: body, pos: 0 };

    let val = match tag {
        TAG_TIMELINE_ID => AttrVal::TimelineId(TimelineId::from_bytes(r.array::<16>()?)),
        TAG_STRING => {
            let len = u32::from_be_bytes(r.array::<4>()?) as usize;
            let raw = r.take(len)?;
            let s = std::str::from_utf8(raw).map_err(|_| MalformedReason::BadUtf8)?;
            AttrVal::String(s.to_owned())
        }
        TAG_INTEGER => AttrVal::Integer(i64::from_be_bytes(r.array::<8>()?)),
        TAG_BIGINT => {
            let lsb = u64::from_be_bytes(r.array::<8>()?);
            let msb = u64::from_be_bytes(r.array::<8>()?);
            AttrVal::BigInt(BigInt::from_parts(lsb, msb))
        }
        TAG_FLOAT => AttrVal::Float(f64::from_bits(u64::from_be_bytes(r.array::<8>()?))),
        TAG_BOOL => match r.array::<1>()?[0] {
            0 => AttrVal::Bool(false),
            1 => AttrVal::Bool(true),
            other => return Err(MalformedReason::BadBool(other).into()),
        },
        TAG_TIMESTAMP => AttrVal::Timestamp(Nanoseconds::new(u64::from_be_bytes(r.array::<8>()?))),
        TAG_LOGICAL_TIME => {
            let arity = r.array::<1>()?[0];
            if arity == 0 || arity as usize > LogicalTime::MAX_ARITY {
                return Err(MalformedReason::BadArity(arity).into());
            }
            let mut segs = [0u64; LogicalTime::MAX_ARITY];
            for seg in segs.iter_mut().take(arity as usize) {
                *seg = u64::from_be_bytes(r.array::<8>()?);
            }
            let lt = LogicalTime::from_segments(&segs[..arity as usize])
                .ok_or(MalformedReason::BadArity(arity))?;
            AttrVal::LogicalTime(lt)
        }
        other => return Err(MalformedReason::UnknownTag(other).into()),
    };

    Ok((val, 1 + r.pos))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], MalformedReason> {
        let available = self.buf.len() - self.pos;
        if n > available {
            return Err(MalformedReason::Truncated {
                needed: n,
                available,
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], MalformedReason> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

// ============================================================================
// Tests
// ============================================================================
