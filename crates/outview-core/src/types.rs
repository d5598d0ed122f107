//! Shared value and enum types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// A parameter value as passed between provider and host.
///
/// Deserialization order matters: a JSON integer becomes `Int`, a JSON
/// number with a fractional part or exponent becomes `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Convert a JSON scalar. Returns `None` for null, arrays, objects and
    /// integers that do not fit in `i64`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::String(s) => Some(Self::Str(s.clone())),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else if n.is_u64() {
                    None
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            _ => None,
        }
    }

    /// Convert back into a JSON value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::Float(f) => JsonValue::from(*f),
            Self::Str(s) => JsonValue::String(s.clone()),
        }
    }

    /// The kind inferred from the runtime type of the value.
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Bool(_) => ParamKind::Boolean,
            Self::Int(_) => ParamKind::Integer,
            Self::Float(_) => ParamKind::Float,
            Self::Str(_) => ParamKind::String,
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Coerce this value to `kind`.
    ///
    /// Exact kind matches pass through; an integer widens to a float.
    /// Everything else is a mismatch and yields `None`.
    pub fn coerce_to(&self, kind: ParamKind) -> Option<Self> {
        match (self, kind) {
            (Self::Int(i), ParamKind::Float) => Some(Self::Float(*i as f64)),
            (v, k) if v.kind() == k => Some(v.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// The kind of an interactive parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Boolean,
    String,
    Integer,
    Float,
}

impl ParamKind {
    /// Whether min/max/step apply to this kind.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(Self::Boolean),
            "string" => Ok(Self::String),
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            other => Err(format!("unknown parameter type '{}'", other)),
        }
    }
}

/// Form control used to render an interactive parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Checkbox,
    TextInput,
    Stepper,
    RangeSlider,
    Select,
}

/// Rendering category of a provider result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    Link,
    Image,
    Html,
}

impl DisplayType {
    /// Payload keys that must be present for this display type.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Link => &["url", "label"],
            Self::Image => &["image", "mime-type"],
            Self::Html => &["output"],
        }
    }

    /// Payload keys that may be present in addition to the required set.
    pub fn optional_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Html => &["js"],
            _ => &[],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Image => "image",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link" => Ok(Self::Link),
            "image" => Ok(Self::Image),
            "html" => Ok(Self::Html),
            other => Err(format!("unknown display type '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_inference_from_json() {
        assert_eq!(ParamValue::from_json(&json!(false)).unwrap().kind(), ParamKind::Boolean);
        assert_eq!(ParamValue::from_json(&json!(5)).unwrap().kind(), ParamKind::Integer);
        assert_eq!(ParamValue::from_json(&json!(5.5)).unwrap().kind(), ParamKind::Float);
        assert_eq!(ParamValue::from_json(&json!("red")).unwrap().kind(), ParamKind::String);
        assert!(ParamValue::from_json(&json!(null)).is_none());
        assert!(ParamValue::from_json(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_untagged_deserialize_keeps_int_and_float_apart() {
        let v: ParamValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, ParamValue::Int(3));
        let v: ParamValue = serde_json::from_str("3.0").unwrap();
        assert_eq!(v, ParamValue::Float(3.0));
    }

    #[test]
    fn test_coerce_widens_int_to_float_only() {
        assert_eq!(
            ParamValue::Int(2).coerce_to(ParamKind::Float),
            Some(ParamValue::Float(2.0))
        );
        assert_eq!(ParamValue::Float(2.5).coerce_to(ParamKind::Integer), None);
        assert_eq!(ParamValue::Bool(true).coerce_to(ParamKind::String), None);
        assert_eq!(
            ParamValue::from("x").coerce_to(ParamKind::String),
            Some(ParamValue::from("x"))
        );
    }

    #[test]
    fn test_display_type_required_fields() {
        assert_eq!(DisplayType::Link.required_fields(), &["url", "label"]);
        assert_eq!(DisplayType::Image.required_fields(), &["image", "mime-type"]);
        assert_eq!(DisplayType::Html.required_fields(), &["output"]);
        assert_eq!("html".parse::<DisplayType>().unwrap(), DisplayType::Html);
        assert!("pdf".parse::<DisplayType>().is_err());
    }
}
