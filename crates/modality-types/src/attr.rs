//! Attribute values.
//!
//! An [`AttrVal`] is a closed tagged union. Two of its variants are
//! fixed-width types with no native Rust counterpart in the protocol's sense:
//!
//! - [`BigInt`]: 128-bit unsigned, addressed as (lsb, msb) 64-bit halves.
//! - [`LogicalTime`]: 1 to 4 ordered 64-bit segments. Segment 0 is the least
//!   significant (most local) by producer convention.
//!
//! ```text
//! LogicalTime::Unary([a])            a
//! LogicalTime::Binary([a, b])        b.a
//! LogicalTime::Trinary([a, b, c])    c.b.a
//! LogicalTime::Quaternary([a,b,c,d]) d.c.b.a
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::ids::TimelineId;

// ============================================================================
// BigInt
// ============================================================================

/// 128-bit unsigned integer, decomposable into 64-bit halves without loss.
///
/// Human-readable formats carry it as a decimal string, since JSON numbers
/// stop at 64 bits.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BigInt(u128);

impl BigInt {
    pub const MAX: BigInt = BigInt(u128::MAX);

    pub fn new(v: u128) -> Self {
        Self(v)
    }

    /// Build from least-significant and most-significant halves.
    pub fn from_parts(lsb: u64, msb: u64) -> Self {
        Self(((msb as u128) << 64) | lsb as u128)
    }

    pub fn lsb(&self) -> u64 {
        self.0 as u64
    }

    pub fn msb(&self) -> u64 {
        (self.0 >> 64) as u64
    }

    /// `(lsb, msb)`.
    pub fn parts(&self) -> (u64, u64) {
        (self.lsb(), self.msb())
    }

    pub fn get(&self) -> u128 {
        self.0
    }
}

impl From<u128> for BigInt {
    fn from(v: u128) -> Self {
        Self(v)
    }
}

impl From<BigInt> for u128 {
    fn from(v: BigInt) -> u128 {
        v.0
    }
}

impl Serialize for BigInt {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() {
            s.collect_str(&self.0)
        } else {
            s.serialize_u128(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for BigInt {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        if d.is_human_readable() {
            let s = String::deserialize(d)?;
            s.parse::<u128>().map(Self).map_err(serde::de::Error::custom)
        } else {
            u128::deserialize(d).map(Self)
        }
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// LogicalTime
// ============================================================================

/// Variable-arity causal time token.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalTime {
    Unary([u64; 1]),
    Binary([u64; 2]),
    Trinary([u64; 3]),
    Quaternary([u64; 4]),
}

impl LogicalTime {
    pub const MAX_ARITY: usize = 4;

    pub fn unary(a: u64) -> Self {
        Self::Unary([a])
    }

    pub fn binary(a: u64, b: u64) -> Self {
        Self::Binary([a, b])
    }

    pub fn trinary(a: u64, b: u64, c: u64) -> Self {
        Self::Trinary([a, b, c])
    }

    pub fn quaternary(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self::Quaternary([a, b, c, d])
    }

    /// Build from 1 to 4 segments; `None` for any other length.
    pub fn from_segments(segments: &[u64]) -> Option<Self> {
        match *segments {
            [a] => Some(Self::Unary([a])),
            [a, b] => Some(Self::Binary([a, b])),
            [a, b, c] => Some(Self::Trinary([a, b, c])),
            [a, b, c, d] => Some(Self::Quaternary([a, b, c, d])),
            _ => None,
        }
    }

    pub fn segments(&self) -> &[u64] {
        match self {
            Self::Unary(s) => s,
            Self::Binary(s) => s,
            Self::Trinary(s) => s,
            Self::Quaternary(s) => s,
        }
    }

    pub fn arity(&self) -> u8 {
        self.segments().len() as u8
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Most significant first, dot separated.
        let mut first = true;
        for seg in self.segments().iter().rev() {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
            first = false;
        }
        Ok(())
    }
}

// ============================================================================
// Nanoseconds
// ============================================================================

/// A 64-bit nanosecond timestamp (wall or monotonic, producer's choice).
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nanoseconds(u64);

impl Nanoseconds {
    pub fn new(ns: u64) -> Self {
        Self(ns)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Nanoseconds {
    fn from(ns: u64) -> Self {
        Self(ns)
    }
}

// ============================================================================
// AttrType / AttrVal
// ============================================================================

/// The type of an attribute value, used by parameter descriptors.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttrType {
    TimelineId,
    String,
    Integer,
    #[strum(serialize = "bigint")]
    #[serde(rename = "bigint")]
    BigInt,
    Float,
    Bool,
    Timestamp,
    LogicalTime,
}

/// A typed attribute value. Exactly one variant is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrVal {
    TimelineId(TimelineId),
    String(String),
    Integer(i64),
    #[serde(rename = "bigint")]
    BigInt(BigInt),
    Float(f64),
    Bool(bool),
    Timestamp(Nanoseconds),
    LogicalTime(LogicalTime),
}

impl AttrVal {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrVal::TimelineId(_) => AttrType::TimelineId,
            AttrVal::String(_) => AttrType::String,
            AttrVal::Integer(_) => AttrType::Integer,
            AttrVal::BigInt(_) => AttrType::BigInt,
            AttrVal::Float(_) => AttrType::Float,
            AttrVal::Bool(_) => AttrType::Bool,
            AttrVal::Timestamp(_) => AttrType::Timestamp,
            AttrVal::LogicalTime(_) => AttrType::LogicalTime,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrVal::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrVal::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Compare two numeric values of possibly different numeric variants.
    ///
    /// Integer, BigInt, Float and Timestamp compare against each other;
    /// anything else yields `None`.
    pub fn numeric_cmp(&self, other: &AttrVal) -> Option<Ordering> {
        use AttrVal::*;
        match (self, other) {
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (BigInt(a), BigInt(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            _ => {
                let a = self.as_f64_lossy()?;
                let b = other.as_f64_lossy()?;
                a.partial_cmp(&b)
            }
        }
    }

    fn as_f64_lossy(&self) -> Option<f64> {
        match self {
            AttrVal::Integer(i) => Some(*i as f64),
            AttrVal::BigInt(b) => Some(b.get() as f64),
            AttrVal::Float(f) => Some(*f),
            AttrVal::Timestamp(ns) => Some(ns.get() as f64),
            _ => None,
        }
    }

    /// Loose JSON form: plain JSON scalars for the common variants,
    /// a single-key tagged object for the rest.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            AttrVal::String(s) => Value::String(s.clone()),
            AttrVal::Integer(i) => Value::from(*i),
            AttrVal::Float(f) => Value::from(*f),
            AttrVal::Bool(b) => Value::Bool(*b),
            other => serde_json::to_value(other).unwrap_or(Value::Null),
        }
    }

    /// Inverse of [`AttrVal::to_json`]. Returns `None` for JSON that has no
    /// attribute-value reading (null, arrays, unknown tags).
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::String(s) => Some(AttrVal::String(s.clone())),
            Value::Bool(b) => Some(AttrVal::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(AttrVal::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Some(AttrVal::BigInt(BigInt::new(u as u128)))
                } else {
                    n.as_f64().map(AttrVal::Float)
                }
            }
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            Value::Null | Value::Array(_) => None,
        }
    }
}

impl fmt::Display for AttrVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrVal::TimelineId(id) => write!(f, "{id}"),
            AttrVal::String(s) => write!(f, "{s:?}"),
            AttrVal::Integer(i) => write!(f, "{i}"),
            AttrVal::BigInt(b) => write!(f, "{b}"),
            AttrVal::Float(x) => write!(f, "{x}"),
            AttrVal::Bool(b) => write!(f, "{b}"),
            AttrVal::Timestamp(ns) => write!(f, "{}ns", ns.get()),
            AttrVal::LogicalTime(lt) => write!(f, "{lt}"),
        }
    }
}

macro_rules! impl_from_for_attr_val {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for AttrVal {
                fn from(v: $t) -> Self {
                    AttrVal::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_attr_val! {
    TimelineId => TimelineId,
    String => String,
    &str => String,
    i64 => Integer,
    i32 => Integer,
    BigInt => BigInt,
    f64 => Float,
    bool => Bool,
    Nanoseconds => Timestamp,
    LogicalTime => LogicalTime,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ── BigInt ──────────────────────────────────────────────────────────

    #[test]
    fn test_bigint_parts_roundtrip() {
        for v in [0u128, 1, u64::MAX as u128, (u64::MAX as u128) + 1, u128::MAX] {
            let b = BigInt::new(v);
            let (lsb, msb) = b.parts();
            assert_eq!(BigInt::from_parts(lsb, msb), b);
        }
    }

    #[test]
    fn test_bigint_halves() {
        let b = BigInt::from_parts(0xdead_beef, 0x1);
        assert_eq!(b.lsb(), 0xdead_beef);
        assert_eq!(b.msb(), 0x1);
        assert_eq!(b.get(), (1u128 << 64) | 0xdead_beef);
        assert_eq!(BigInt::MAX.parts(), (u64::MAX, u64::MAX));
    }

    // ── LogicalTime ─────────────────────────────────────────────────────

    #[test]
    fn test_logical_time_arity() {
        assert_eq!(LogicalTime::unary(1).arity(), 1);
        assert_eq!(LogicalTime::binary(1, 2).arity(), 2);
        assert_eq!(LogicalTime::trinary(1, 2, 3).arity(), 3);
        assert_eq!(LogicalTime::quaternary(1, 2, 3, 4).arity(), 4);
    }

    #[test]
    fn test_logical_time_from_segments() {
        assert_eq!(LogicalTime::from_segments(&[7, 8]), Some(LogicalTime::binary(7, 8)));
        assert_eq!(LogicalTime::from_segments(&[]), None);
        assert_eq!(LogicalTime::from_segments(&[1, 2, 3, 4, 5]), None);
    }

    #[test]
    fn test_logical_time_display_most_significant_first() {
        assert_eq!(LogicalTime::trinary(1, 2, 3).to_string(), "3.2.1");
    }

    // ── AttrVal ─────────────────────────────────────────────────────────

    #[test]
    fn test_attr_type_names() {
        assert_eq!(AttrType::BigInt.to_string(), "bigint");
        assert_eq!(AttrType::LogicalTime.to_string(), "logical_time");
        assert_eq!("timeline_id".parse::<AttrType>().unwrap(), AttrType::TimelineId);
        assert_eq!(AttrVal::from(55).attr_type(), AttrType::Integer);
    }

    #[test]
    fn test_numeric_cmp_mixed() {
        let lo = AttrVal::Integer(0);
        let hi = AttrVal::Float(100.0);
        assert_eq!(lo.numeric_cmp(&hi), Some(Ordering::Less));
        assert_eq!(AttrVal::Integer(55).numeric_cmp(&AttrVal::Integer(55)), Some(Ordering::Equal));
        assert_eq!(AttrVal::from("x").numeric_cmp(&lo), None);
    }

    #[test]
    fn test_json_loose_form() {
        let cases = vec![
            AttrVal::Integer(55),
            AttrVal::Float(0.5),
            AttrVal::Bool(true),
            AttrVal::from("hello"),
            AttrVal::BigInt(BigInt::from_parts(1, 2)),
            AttrVal::Timestamp(Nanoseconds::new(12345)),
            AttrVal::LogicalTime(LogicalTime::binary(1, 2)),
            AttrVal::TimelineId(TimelineId::new()),
        ];
        for v in cases {
            let json = v.to_json();
            assert_eq!(AttrVal::from_json(&json), Some(v));
        }
        assert_eq!(AttrVal::Integer(3).to_json(), serde_json::json!(3));
        assert_eq!(AttrVal::from_json(&serde_json::Value::Null), None);
    }

    #[test]
    fn test_postcard_roundtrip() {
        let v = AttrVal::LogicalTime(LogicalTime::quaternary(1, 2, 3, 4));
        let bytes = postcard::to_stdvec(&v).unwrap();
        let parsed: AttrVal = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(v, parsed);
    }
}
