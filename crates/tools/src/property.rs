//! Typed tool parameters.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};

/// Type and range of a tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyKind {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Bool,
    /// Bitmask; only bits in `all` may be set and at least one must be
    Flags { all: u32 },
    Vec3,
}

impl PropertyKind {
    /// Check `value` against this kind, widening integers to floats.
    pub fn check(&self, name: &str, value: &PropertyValue) -> ToolResult<PropertyValue> {
        let mismatch = || {
            ToolError::InvalidArgument(format!("{}: expected {}, got {:?}", name, self.type_name(), value))
        };
        match (self, value) {
            (Self::Int { min, max }, PropertyValue::Int(i)) => {
                if i < min || i > max {
                    return Err(ToolError::InvalidArgument(format!(
                        "{}: {} is outside {}..={}",
                        name, i, min, max
                    )));
                }
                Ok(PropertyValue::Int(*i))
            }
            (Self::Float { min, max }, PropertyValue::Float(_) | PropertyValue::Int(_)) => {
                let f = value.as_f64().ok_or_else(mismatch)?;
                if !(f >= *min && f <= *max) {
                    return Err(ToolError::InvalidArgument(format!(
                        "{}: {} is outside {}..={}",
                        name, f, min, max
                    )));
                }
                Ok(PropertyValue::Float(f))
            }
            (Self::Bool, PropertyValue::Bool(b)) => Ok(PropertyValue::Bool(*b)),
            (Self::Flags { all }, PropertyValue::Int(bits)) => {
                let valid = u32::try_from(*bits)
                    .ok()
                    .filter(|b| *b != 0 && (b & !all) == 0);
                match valid {
                    Some(b) => Ok(PropertyValue::Int(i64::from(b))),
                    None => Err(ToolError::InvalidArgument(format!(
                        "{}: {:#b} is not a mask within {:#b}",
                        name, bits, all
                    ))),
                }
            }
            (Self::Vec3, PropertyValue::Vec3(v)) => {
                if v.iter().all(|c| c.is_finite()) {
                    Ok(PropertyValue::Vec3(*v))
                } else {
                    Err(ToolError::InvalidArgument(format!(
                        "{}: {:?} is not finite",
                        name, v
                    )))
                }
            }
            _ => Err(mismatch()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Bool => "bool",
            Self::Flags { .. } => "flags",
            Self::Vec3 => "vec3",
        }
    }
}

/// Schema entry for one tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: PropertyKind,
    /// Missing default means the invoking context supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<PropertyValue>,
    /// Reuse the last executed value when the caller gives none
    #[serde(default)]
    pub remember_last: bool,
}

impl PropertyDef {
    pub fn new(name: &str, label: &str, kind: PropertyKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            default: None,
            remember_last: false,
        }
    }

    pub fn with_default(mut self, value: PropertyValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn remembered(mut self) -> Self {
        self.remember_last = true;
        self
    }
}

/// A parameter value as received over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Vec3([f32; 3]),
}

impl PropertyValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(Vec3::from_array(*v)),
            _ => None,
        }
    }
}

impl From<Vec3> for PropertyValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v.to_array())
    }
}

/// Named parameter values for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArgs(BTreeMap<String, PropertyValue>);

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn int(&self, name: &str) -> ToolResult<i64> {
        self.get(name)
            .and_then(PropertyValue::as_i64)
            .ok_or_else(|| missing(name, "int"))
    }

    pub fn float(&self, name: &str) -> ToolResult<f64> {
        self.get(name)
            .and_then(PropertyValue::as_f64)
            .ok_or_else(|| missing(name, "float"))
    }

    pub fn bool(&self, name: &str) -> ToolResult<bool> {
        self.get(name)
            .and_then(PropertyValue::as_bool)
            .ok_or_else(|| missing(name, "bool"))
    }

    pub fn vec3(&self, name: &str) -> ToolResult<Vec3> {
        self.get(name)
            .and_then(PropertyValue::as_vec3)
            .ok_or_else(|| missing(name, "vec3"))
    }
}

fn missing(name: &str, ty: &str) -> ToolError {
    ToolError::InvalidArgument(format!("{}: missing {} value", name, ty))
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<[f32; 3]> for PropertyValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_range() {
        let kind = PropertyKind::Int { min: 1, max: 100 };
        assert_eq!(
            kind.check("steps", &PropertyValue::Int(3)).unwrap(),
            PropertyValue::Int(3)
        );
        assert!(matches!(
            kind.check("steps", &PropertyValue::Int(0)),
            Err(ToolError::InvalidArgument(_))
        ));
        assert!(matches!(
            kind.check("steps", &PropertyValue::Float(2.0)),
            Err(ToolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_float_accepts_int_and_rejects_nan() {
        let kind = PropertyKind::Float { min: 0.0, max: 1.0 };
        assert_eq!(
            kind.check("factor", &PropertyValue::Int(1)).unwrap(),
            PropertyValue::Float(1.0)
        );
        assert!(kind.check("factor", &PropertyValue::Float(f64::NAN)).is_err());
        assert!(kind.check("factor", &PropertyValue::Float(1.5)).is_err());
    }

    #[test]
    fn test_flags_mask() {
        let kind = PropertyKind::Flags { all: 0b111 };
        assert!(kind.check("sel_mask", &PropertyValue::Int(0b101)).is_ok());
        assert!(kind.check("sel_mask", &PropertyValue::Int(0)).is_err());
        assert!(kind.check("sel_mask", &PropertyValue::Int(0b1000)).is_err());
        assert!(kind.check("sel_mask", &PropertyValue::Int(-1)).is_err());
    }

    #[test]
    fn test_args_from_json() {
        let args: ToolArgs =
            serde_json::from_str(r#"{"steps": 3, "factor": 0.25, "do_transform": false, "offset": [1, 2, 3]}"#)
                .unwrap();
        assert_eq!(args.int("steps").unwrap(), 3);
        assert_eq!(args.float("factor").unwrap(), 0.25);
        assert!(!args.bool("do_transform").unwrap());
        assert_eq!(args.vec3("offset").unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert!(args.int("missing").is_err());
    }

    #[test]
    fn test_property_def_json_shape() {
        let def = PropertyDef::new("steps", "Steps", PropertyKind::Int { min: 1, max: 100 })
            .with_default(PropertyValue::Int(1))
            .remembered();

        let json = serde_json::to_value(&def).unwrap();

        assert_eq!(json["type"], "int");
        assert_eq!(json["min"], 1);
        assert_eq!(json["default"], 1);
        assert_eq!(json["remember_last"], true);
        let back: PropertyDef = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);
    }
}
