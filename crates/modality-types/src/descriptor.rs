//! Mutator and parameter descriptors.
//!
//! A [`MutatorDescriptor`] is static metadata a mutator reports about itself.
//! On the wire (announcements, the HTTP listing) it travels in a flat
//! attribute form, one `(key, AttrVal)` pair per field:
//!
//! ```text
//! mutator.name                                   "heater-fault"
//! mutator.description                            "..."
//! mutator.layer                                  "implementational"
//! mutator.group                                  "thermal"
//! mutator.operation                              "set_to_value"
//! mutator.statefulness                           "transient"
//! mutator.params.<p>.name                        "<p>"
//! mutator.params.<p>.value_type                  "integer"
//! mutator.params.<p>.value_min                   0
//! mutator.params.<p>.distribution.option_set.<o> ...
//! ```
//!
//! Parameter order is the order of first appearance in the flat form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::attr::{AttrType, AttrVal, BigInt, Nanoseconds};

pub const MUTATOR_PREFIX: &str = "mutator.";
pub const PARAMS_PREFIX: &str = "mutator.params.";
const OPTION_SET_INFIX: &str = ".distribution.option_set.";

// ============================================================================
// Tag enums
// ============================================================================

/// Which layer of the system a mutator acts on.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Layer {
    Implementational,
    Operational,
    #[strum(to_string = "environmental", serialize = "physical")]
    Environmental,
}

/// What kind of change a mutator makes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Operation {
    Delay,
    Duplicate,
    DropFraction,
    DropPositional,
    Disable,
    Enable,
    Corrupt,
    SetToValue,
    SubstituteNextValue,
    Reorder,
    Stimulate,
}

/// How long an injected mutation's effect persists.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Statefulness {
    Permanent,
    Intermittent,
    Transient,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DistributionKind {
    Continuous,
    Discrete,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Scaling {
    None,
    Linear,
    Logarithmic,
    Complex,
    Circular,
}

// ============================================================================
// Descriptors
// ============================================================================

/// Static description of one mutator parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub value_type: AttrType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_min: Option<AttrVal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_max: Option<AttrVal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<AttrVal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub least_effect_value: Option<AttrVal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_kind: Option<DistributionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_scaling: Option<Scaling>,
    /// Named options, when the distribution is discrete-from-set.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub option_set: BTreeMap<String, AttrVal>,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<String>, value_type: AttrType) -> Self {
        Self {
            name: name.into(),
            value_type,
            description: None,
            value_min: None,
            value_max: None,
            default_value: None,
            least_effect_value: None,
            distribution_kind: None,
            distribution_scaling: None,
            option_set: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    /// Inclusive bounds.
    pub fn with_range(mut self, min: impl Into<AttrVal>, max: impl Into<AttrVal>) -> Self {
        self.value_min = Some(min.into());
        self.value_max = Some(max.into());
        self
    }

    pub fn with_default(mut self, v: impl Into<AttrVal>) -> Self {
        self.default_value = Some(v.into());
        self
    }

    pub fn with_least_effect(mut self, v: impl Into<AttrVal>) -> Self {
        self.least_effect_value = Some(v.into());
        self
    }

    pub fn with_distribution(mut self, kind: DistributionKind, scaling: Option<Scaling>) -> Self {
        self.distribution_kind = Some(kind);
        self.distribution_scaling = scaling;
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, v: impl Into<AttrVal>) -> Self {
        self.option_set.insert(name.into(), v.into());
        self
    }

    /// Widen a numeric value to the declared type, then [`check`](Self::check) it.
    ///
    /// Integers become floats, and non-negative integers become bigints or
    /// timestamps. A bigint that fits in 64 bits becomes a timestamp.
    pub fn coerce(&self, val: AttrVal) -> Result<AttrVal, ParamError> {
        let val = match (self.value_type, val) {
            (AttrType::Float, AttrVal::Integer(i)) => AttrVal::Float(i as f64),
            (AttrType::BigInt, AttrVal::Integer(i)) if i >= 0 => {
                AttrVal::BigInt(BigInt::new(i as u128))
            }
            (AttrType::Timestamp, AttrVal::Integer(i)) if i >= 0 => {
                AttrVal::Timestamp(Nanoseconds::new(i as u64))
            }
            (AttrType::Timestamp, AttrVal::BigInt(b)) => match u64::try_from(b.get()) {
                Ok(ns) => AttrVal::Timestamp(Nanoseconds::new(ns)),
                Err(_) => AttrVal::BigInt(b),
            },
            (_, v) => v,
        };
        self.check(&val)?;
        Ok(val)
    }

    /// Check a value of exactly the declared type against bounds and option set.
    pub fn check(&self, val: &AttrVal) -> Result<(), ParamError> {
        if val.attr_type() != self.value_type {
            return Err(ParamError::WrongType {
                param: self.name.clone(),
                expected: self.value_type,
                got: val.attr_type(),
            });
        }
        if let Some(min) = &self.value_min
            && val.numeric_cmp(min) == Some(std::cmp::Ordering::Less)
        {
            return Err(ParamError::OutOfRange {
                param: self.name.clone(),
                value: val.clone(),
            });
        }
        if let Some(max) = &self.value_max
            && val.numeric_cmp(max) == Some(std::cmp::Ordering::Greater)
        {
            return Err(ParamError::OutOfRange {
                param: self.name.clone(),
                value: val.clone(),
            });
        }
        if !self.option_set.is_empty() && !self.option_set.values().any(|o| o == val) {
            return Err(ParamError::NotInOptionSet {
                param: self.name.clone(),
                value: val.clone(),
            });
        }
        Ok(())
    }
}

/// Static description of a mutator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutatorDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<Layer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statefulness: Option<Statefulness>,
    #[serde(default)]
    pub params: Vec<ParamDescriptor>,
}

impl MutatorDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            layer: None,
            group: None,
            operation: None,
            statefulness: None,
            params: Vec::new(),
        }
    }

    pub fn with_description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_operation(mut self, op: Operation) -> Self {
        self.operation = Some(op);
        self
    }

    pub fn with_statefulness(mut self, s: Statefulness) -> Self {
        self.statefulness = Some(s);
        self
    }

    pub fn with_param(mut self, p: ParamDescriptor) -> Self {
        self.params.push(p);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Flatten into `mutator.*` attributes.
    pub fn to_attributes(&self) -> Vec<(String, AttrVal)> {
        let mut out = vec![("mutator.name".to_string(), AttrVal::from(self.name.as_str()))];
        let mut push_str = |key: &str, v: Option<&str>| {
            if let Some(v) = v {
                out.push((format!("{MUTATOR_PREFIX}{key}"), AttrVal::from(v)));
            }
        };
        push_str("description", self.description.as_deref());
        push_str("layer", self.layer.map(<&'static str>::from));
        push_str("group", self.group.as_deref());
        push_str("operation", self.operation.map(<&'static str>::from));
        push_str("statefulness", self.statefulness.map(<&'static str>::from));

        for p in &self.params {
            let base = format!("{PARAMS_PREFIX}{}", p.name);
            out.push((format!("{base}.name"), AttrVal::from(p.name.as_str())));
            let value_type = <&'static str>::from(p.value_type);
            out.push((format!("{base}.value_type"), AttrVal::from(value_type)));
            if let Some(d) = &p.description {
                out.push((format!("{base}.description"), AttrVal::from(d.as_str())));
            }
            for (suffix, v) in [
                ("value_min", &p.value_min),
                ("value_max", &p.value_max),
                ("default_value", &p.default_value),
                ("least_effect_value", &p.least_effect_value),
            ] {
                if let Some(v) = v {
                    out.push((format!("{base}.{suffix}"), v.clone()));
                }
            }
            if let Some(k) = p.distribution_kind {
                let kind = <&'static str>::from(k);
                out.push((format!("{base}.distribution.kind"), AttrVal::from(kind)));
            }
            if let Some(s) = p.distribution_scaling {
                let scaling = <&'static str>::from(s);
                out.push((format!("{base}.distribution.scaling"), AttrVal::from(scaling)));
            }
            for (name, v) in &p.option_set {
                out.push((format!("{base}{OPTION_SET_INFIX}{name}"), v.clone()));
            }
        }
        out
    }

    /// Rebuild from flat attributes. Keys outside `mutator.*` are ignored.
    pub fn from_attributes<I>(attrs: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = (String, AttrVal)>,
    {
        let mut name = None;
        let mut desc = MutatorDescriptor::new(String::new());
        let mut params: Vec<PartialParam> = Vec::new();

        for (key, val) in attrs {
            if let Some(rest) = key.strip_prefix(PARAMS_PREFIX) {
                let (param_key, field) = split_param_key(rest)
                    .ok_or_else(|| DescriptorError::UnknownKey(key.clone()))?;
                let idx = match params.iter().position(|p| p.key == param_key) {
                    Some(i) => i,
                    None => {
                        params.push(PartialParam::new(param_key));
                        params.len() - 1
                    }
                };
                params[idx].apply(field, &key, val)?;
                continue;
            }
            let Some(field) = key.strip_prefix(MUTATOR_PREFIX) else {
                continue;
            };
            match field {
                "name" => name = Some(expect_str(&key, val)?),
                "description" => desc.description = Some(expect_str(&key, val)?),
                "group" => desc.group = Some(expect_str(&key, val)?),
                "layer" => desc.layer = Some(parse_tag(&key, val)?),
                "operation" => desc.operation = Some(parse_tag(&key, val)?),
                "statefulness" => desc.statefulness = Some(parse_tag(&key, val)?),
                // Other mutator.* keys (ids, receive times) belong to the carrier.
                _ => {}
            }
        }

        desc.name = name.ok_or(DescriptorError::Missing("mutator.name".into()))?;
        desc.params = params
            .into_iter()
            .map(PartialParam::finish)
            .collect::<Result<_, _>>()?;
        Ok(desc)
    }
}

// ── Flat-form parsing helpers ───────────────────────────────────────────────

enum ParamField<'a> {
    Name,
    ValueType,
    Description,
    Min,
    Max,
    Default,
    LeastEffect,
    DistKind,
    DistScaling,
    Option(&'a str),
}

/// Split `<param>.<field>`; param keys may themselves contain dots.
fn split_param_key(rest: &str) -> Option<(&str, ParamField<'_>)> {
    if let Some(idx) = rest.find(OPTION_SET_INFIX) {
        let option = &rest[idx + OPTION_SET_INFIX.len()..];
        return (idx > 0 && !option.is_empty()).then(|| (&rest[..idx], ParamField::Option(option)));
    }
    let suffixes = [
        (".name", ParamField::Name),
        (".value_type", ParamField::ValueType),
        (".description", ParamField::Description),
        (".value_min", ParamField::Min),
        (".value_max", ParamField::Max),
        (".default_value", ParamField::Default),
        (".least_effect_value", ParamField::LeastEffect),
        (".distribution.kind", ParamField::DistKind),
        (".distribution.scaling", ParamField::DistScaling),
    ];
    suffixes.into_iter().find_map(|(suffix, field)| {
        rest.strip_suffix(suffix)
            .filter(|param| !param.is_empty())
            .map(|param| (param, field))
    })
}

struct PartialParam {
    key: String,
    name: Option<String>,
    value_type: Option<AttrType>,
    rest: ParamDescriptor,
}

impl PartialParam {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            name: None,
            value_type: None,
            rest: ParamDescriptor::new(key, AttrType::Integer),
        }
    }

    fn apply(
        &mut self,
        field: ParamField<'_>,
        key: &str,
        val: AttrVal,
    ) -> Result<(), DescriptorError> {
        match field {
            ParamField::Name => self.name = Some(expect_str(key, val)?),
            ParamField::ValueType => self.value_type = Some(parse_tag(key, val)?),
            ParamField::Description => self.rest.description = Some(expect_str(key, val)?),
            ParamField::Min => self.rest.value_min = Some(val),
            ParamField::Max => self.rest.value_max = Some(val),
            ParamField::Default => self.rest.default_value = Some(val),
            ParamField::LeastEffect => self.rest.least_effect_value = Some(val),
            ParamField::DistKind => self.rest.distribution_kind = Some(parse_tag(key, val)?),
            ParamField::DistScaling => self.rest.distribution_scaling = Some(parse_tag(key, val)?),
            ParamField::Option(o) => {
                self.rest.option_set.insert(o.to_string(), val);
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<ParamDescriptor, DescriptorError> {
        let value_type = self.value_type.ok_or_else(|| {
            DescriptorError::Missing(format!("{PARAMS_PREFIX}{}.value_type", self.key))
        })?;
        Ok(ParamDescriptor {
            name: self.name.unwrap_or(self.key),
            value_type,
            ..self.rest
        })
    }
}

fn expect_str(key: &str, val: AttrVal) -> Result<String, DescriptorError> {
    match val {
        AttrVal::String(s) => Ok(s),
        other => Err(DescriptorError::Invalid {
            key: key.to_string(),
            reason: format!("expected string, got {}", other.attr_type()),
        }),
    }
}

fn parse_tag<T: std::str::FromStr>(key: &str, val: AttrVal) -> Result<T, DescriptorError> {
    let s = expect_str(key, val)?;
    s.parse().map_err(|_| DescriptorError::Invalid {
        key: key.to_string(),
        reason: format!("unrecognized value '{s}'"),
    })
}

// ============================================================================
// Errors
// ============================================================================

/// A flat attribute set could not be read back as a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("missing required attribute '{0}'")]
    Missing(String),
    #[error("invalid attribute '{key}': {reason}")]
    Invalid { key: String, reason: String },
    #[error("unrecognized descriptor attribute '{0}'")]
    UnknownKey(String),
}

/// A supplied parameter value does not fit its descriptor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter '{0}'")]
    Unknown(String),
    #[error("parameter '{param}' expects {expected}, got {got}")]
    WrongType {
        param: String,
        expected: AttrType,
        got: AttrType,
    },
    #[error("parameter '{param}' value {value} is out of range")]
    OutOfRange { param: String, value: AttrVal },
    #[error("parameter '{param}' value {value} is not in the option set")]
    NotInOptionSet { param: String, value: AttrVal },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn heater() -> MutatorDescriptor {
        MutatorDescriptor::new("heater-fault")
            .with_description("Forces the heater duty cycle")
            .with_layer(Layer::Implementational)
            .with_group("thermal")
            .with_operation(Operation::SetToValue)
            .with_statefulness(Statefulness::Transient)
            .with_param(
                ParamDescriptor::new("duty", AttrType::Integer)
                    .with_description("percent")
                    .with_range(0, 100)
                    .with_default(50)
                    .with_least_effect(0)
                    .with_distribution(DistributionKind::Continuous, Some(Scaling::Linear)),
            )
            .with_param(
                ParamDescriptor::new("mode", AttrType::String)
                    .with_distribution(DistributionKind::Discrete, None)
                    .with_option("off", "off")
                    .with_option("max", "max"),
            )
    }

    // ── Tag names ───────────────────────────────────────────────────────

    #[test]
    fn test_tag_names_are_snake_case() {
        assert_eq!(Operation::SetToValue.to_string(), "set_to_value");
        assert_eq!("drop_fraction".parse::<Operation>().unwrap(), Operation::DropFraction);
        assert_eq!("physical".parse::<Layer>().unwrap(), Layer::Environmental);
        assert_eq!("TRANSIENT".parse::<Statefulness>().unwrap(), Statefulness::Transient);
        assert_eq!(Scaling::Logarithmic.to_string(), "logarithmic");
    }

    // ── Flat attribute form ─────────────────────────────────────────────

    #[test]
    fn test_flat_form_keys() {
        let attrs = heater().to_attributes();
        let get = |k: &str| attrs.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone());
        assert_eq!(get("mutator.name"), Some(AttrVal::from("heater-fault")));
        assert_eq!(get("mutator.operation"), Some(AttrVal::from("set_to_value")));
        assert_eq!(get("mutator.params.duty.value_type"), Some(AttrVal::from("integer")));
        assert_eq!(get("mutator.params.duty.value_max"), Some(AttrVal::Integer(100)));
        assert_eq!(
            get("mutator.params.duty.distribution.scaling"),
            Some(AttrVal::from("linear"))
        );
        assert_eq!(
            get("mutator.params.mode.distribution.option_set.max"),
            Some(AttrVal::from("max"))
        );
    }

    #[test]
    fn test_flat_form_roundtrip_preserves_param_order() {
        let d = heater();
        let back = MutatorDescriptor::from_attributes(d.to_attributes()).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.params[0].name, "duty");
        assert_eq!(back.params[1].name, "mode");
    }

    #[test]
    fn test_dotted_param_names() {
        let d = MutatorDescriptor::new("m")
            .with_param(ParamDescriptor::new("a.b.name", AttrType::Bool));
        let back = MutatorDescriptor::from_attributes(d.to_attributes()).unwrap();
        assert_eq!(back.params[0].name, "a.b.name");
    }

    #[test]
    fn test_from_attributes_ignores_foreign_keys() {
        let mut attrs = heater().to_attributes();
        attrs.push(("mutator.id".into(), AttrVal::Integer(7)));
        attrs.push(("event.name".into(), AttrVal::from("x")));
        assert!(MutatorDescriptor::from_attributes(attrs).is_ok());
    }

    #[test]
    fn test_from_attributes_errors() {
        let err = MutatorDescriptor::from_attributes(vec![]).unwrap_err();
        assert_eq!(err, DescriptorError::Missing("mutator.name".into()));

        let err = MutatorDescriptor::from_attributes(vec![
            ("mutator.name".into(), AttrVal::from("m")),
            ("mutator.layer".into(), AttrVal::from("orbital")),
        ])
        .unwrap_err();
        assert!(matches!(err, DescriptorError::Invalid { .. }));

        let err = MutatorDescriptor::from_attributes(vec![
            ("mutator.name".into(), AttrVal::from("m")),
            ("mutator.params.p.name".into(), AttrVal::from("p")),
        ])
        .unwrap_err();
        assert_eq!(err, DescriptorError::Missing("mutator.params.p.value_type".into()));
    }

    // ── Param checks ────────────────────────────────────────────────────

    #[test]
    fn test_param_check_bounds() {
        let p = heater().params[0].clone();
        assert!(p.check(&AttrVal::Integer(55)).is_ok());
        assert!(p.check(&AttrVal::Integer(0)).is_ok());
        assert!(p.check(&AttrVal::Integer(100)).is_ok());
        assert!(matches!(p.check(&AttrVal::Integer(101)), Err(ParamError::OutOfRange { .. })));
        assert!(matches!(p.check(&AttrVal::Integer(-1)), Err(ParamError::OutOfRange { .. })));
        assert!(matches!(p.check(&AttrVal::from("55")), Err(ParamError::WrongType { .. })));
    }

    #[test]
    fn test_param_coerce_widens_integers() {
        let f = ParamDescriptor::new("ratio", AttrType::Float).with_range(0.0, 1.0);
        assert_eq!(f.coerce(AttrVal::Integer(1)).unwrap(), AttrVal::Float(1.0));
        assert!(matches!(f.coerce(AttrVal::Integer(2)), Err(ParamError::OutOfRange { .. })));
        assert!(matches!(f.check(&AttrVal::Integer(1)), Err(ParamError::WrongType { .. })));

        let b = ParamDescriptor::new("offset", AttrType::BigInt);
        assert_eq!(b.coerce(AttrVal::Integer(5)).unwrap(), AttrVal::BigInt(BigInt::new(5)));
        assert!(matches!(b.coerce(AttrVal::Integer(-5)), Err(ParamError::WrongType { .. })));

        let t = ParamDescriptor::new("at", AttrType::Timestamp);
        assert_eq!(
            t.coerce(AttrVal::Integer(7)).unwrap(),
            AttrVal::Timestamp(Nanoseconds::new(7))
        );
        let wide = AttrVal::BigInt(BigInt::new(1 << 63));
        assert_eq!(
            t.coerce(wide).unwrap(),
            AttrVal::Timestamp(Nanoseconds::new(1 << 63))
        );
        assert!(matches!(
            t.coerce(AttrVal::BigInt(BigInt::MAX)),
            Err(ParamError::WrongType { .. })
        ));
    }

    #[test]
    fn test_param_check_option_set() {
        let p = heater().params[1].clone();
        assert!(p.check(&AttrVal::from("off")).is_ok());
        assert!(matches!(p.check(&AttrVal::from("half")), Err(ParamError::NotInOptionSet { .. })));
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let d = heater();
        let json = serde_json::to_string(&d).unwrap();
        let back: MutatorDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
