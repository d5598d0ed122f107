//! JSON Schema validation for raw parameter descriptors.
//!
//! Descriptors are checked structurally against
//! schemas/interactive-parameter.schema.json before the parser applies the
//! semantic rules (identifier names, option compatibility, bounds).

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded descriptor schema (loaded at compile time).
const PARAMETER_SCHEMA_JSON: &str =
    include_str!("../../schemas/interactive-parameter.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

/// A single structural violation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    /// Top-level descriptor key the violation sits under, or `descriptor`
    /// when it concerns the object as a whole.
    pub field: String,

    /// Validator message.
    pub message: String,
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(PARAMETER_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// First segment of a JSON pointer such as `/options/1/0`.
fn top_level_field(pointer: &str) -> String {
    pointer
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("descriptor")
        .to_string()
}

/// Validate a raw descriptor against the schema.
///
/// Returns every violation found, in validator order.
pub fn validate_descriptor_schema(
    descriptor: &serde_json::Value,
) -> Result<(), Vec<SchemaViolation>> {
    let validator = get_validator().map_err(|e| {
        vec![SchemaViolation {
            field: "descriptor".to_string(),
            message: e.to_string(),
        }]
    })?;

    let violations: Vec<SchemaViolation> = validator
        .iter_errors(descriptor)
        .map(|e| {
            let pointer = e.instance_path.to_string();
            SchemaViolation {
                field: top_level_field(&pointer),
                message: e.to_string(),
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Check whether a raw descriptor is structurally valid.
pub fn is_valid_descriptor(descriptor: &serde_json::Value) -> bool {
    get_validator()
        .map(|v| v.is_valid(descriptor))
        .unwrap_or(false)
}
