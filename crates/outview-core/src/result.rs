//! Provider result parsing and validation.
//!
//! A provider returns a JSON object whose required keys depend on the
//! provider's display type:
//! - link: `url`, `label`
//! - image: `image` (base64), `mime-type`
//! - html: `output`, optionally `js`
//!
//! Any type may add an `interactive` list of parameter descriptors.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::control::{build_controls, Control};
use crate::parameter::{parse_interactive, ParameterDescriptor, ValidationError};
use crate::types::DisplayType;

/// Errors from validating a provider result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResultError {
    #[error("Provider result must be a JSON object")]
    NotAnObject,

    #[error("Incomplete {display_type} result, missing: {}", .missing.join(", "))]
    Incomplete {
        display_type: DisplayType,
        missing: Vec<String>,
    },

    #[error("Invalid result field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    Parameter(#[from] ValidationError),
}

/// Display-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "display_type", rename_all = "lowercase")]
pub enum ViewPayload {
    Link {
        url: String,
        label: String,
    },
    Image {
        #[serde(serialize_with = "serialize_base64")]
        image: Vec<u8>,
        #[serde(rename = "mime-type")]
        mime_type: String,
    },
    Html {
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        js: Option<String>,
    },
}

impl ViewPayload {
    pub fn display_type(&self) -> DisplayType {
        match self {
            Self::Link { .. } => DisplayType::Link,
            Self::Image { .. } => DisplayType::Image,
            Self::Html { .. } => DisplayType::Html,
        }
    }

    /// `data:` URL for embedding an image payload.
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Image { image, mime_type } => {
                Some(format!("data:{};base64,{}", mime_type, STANDARD.encode(image)))
            }
            _ => None,
        }
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// A validated provider result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewProviderResult {
    #[serde(flatten)]
    pub payload: ViewPayload,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interactive: Vec<ParameterDescriptor>,
}

impl ViewProviderResult {
    /// Validate a raw provider result for `display_type`.
    pub fn from_value(display_type: DisplayType, value: &JsonValue) -> Result<Self, ResultError> {
        let obj = value.as_object().ok_or(ResultError::NotAnObject)?;

        let missing: Vec<String> = display_type
            .required_fields()
            .iter()
            .filter(|field| obj.get(**field).map_or(true, JsonValue::is_null))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ResultError::Incomplete {
                display_type,
                missing,
            });
        }

        for key in obj.keys() {
            let known = key == "interactive"
                || display_type.required_fields().contains(&key.as_str())
                || display_type.optional_fields().contains(&key.as_str());
            if !known {
                tracing::debug!(field = %key, display_type = %display_type, "Ignoring unrecognized result field");
            }
        }

        let payload = match display_type {
            DisplayType::Link => ViewPayload::Link {
                url: require_str(obj, "url")?,
                label: require_str(obj, "label")?,
            },
            DisplayType::Image => ViewPayload::Image {
                image: decode_image(obj)?,
                mime_type: require_str(obj, "mime-type")?,
            },
            DisplayType::Html => ViewPayload::Html {
                output: require_str(obj, "output")?,
                js: optional_str(obj, "js")?,
            },
        };

        let interactive = match obj.get("interactive") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(raw) => parse_interactive(raw)?,
        };

        Ok(Self {
            payload,
            interactive,
        })
    }

    pub fn display_type(&self) -> DisplayType {
        self.payload.display_type()
    }

    /// Form controls for the interactive parameters, in declaration order.
    pub fn controls(&self) -> Vec<Control> {
        build_controls(&self.interactive)
    }

    /// Serialize back to the result mapping shape.
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

fn require_str(obj: &Map<String, JsonValue>, field: &str) -> Result<String, ResultError> {
    match obj.get(field) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        _ => Err(ResultError::InvalidField {
            field: field.to_string(),
            reason: "must be a string".to_string(),
        }),
    }
}

fn optional_str(obj: &Map<String, JsonValue>, field: &str) -> Result<Option<String>, ResultError> {
    match obj.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ResultError::InvalidField {
            field: field.to_string(),
            reason: "must be a string".to_string(),
        }),
    }
}

fn decode_image(obj: &Map<String, JsonValue>) -> Result<Vec<u8>, ResultError> {
    let encoded = require_str(obj, "image")?;
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| ResultError::InvalidField {
            field: "image".to_string(),
            reason: format!("not valid base64: {}", e),
        })
}
