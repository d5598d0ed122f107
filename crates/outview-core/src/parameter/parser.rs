//! Interactive parameter parsing and validation.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;

use super::schema::validate_descriptor_schema;
use crate::types::{ParamKind, ParamValue};

lazy_static! {
    /// Parameter names become keyword arguments, so they must be identifiers.
    static ref IDENTIFIER_PATTERN: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Check whether `name` can be used as a parameter name.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(name)
}

/// A malformed parameter descriptor.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid parameter field `{field}`: {reason}")]
pub struct ValidationError {
    /// The offending field (e.g. `min`, or `interactive[2].options`)
    pub field: String,

    /// What is wrong with it
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn in_entry(self, index: usize) -> Self {
        Self {
            field: format!("interactive[{}].{}", index, self.field),
            reason: self.reason,
        }
    }
}

/// Choices offered for a parameter.
///
/// A list is either all bare values or all `(label, value)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamOptions {
    Values(Vec<ParamValue>),
    Labelled(Vec<(String, ParamValue)>),
}

impl ParamOptions {
    pub fn len(&self) -> usize {
        match self {
            Self::Values(v) => v.len(),
            Self::Labelled(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Options as `(label, value)` pairs; bare values label themselves.
    pub fn pairs(&self) -> Vec<(String, ParamValue)> {
        match self {
            Self::Values(values) => values.iter().map(|v| (v.to_string(), v.clone())).collect(),
            Self::Labelled(pairs) => pairs.clone(),
        }
    }
}

/// A validated interactive parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Keyword argument name, unique within one result
    pub name: String,

    /// Current value
    pub value: ParamValue,

    /// Kind inferred from `value` (or widened by a `type` hint)
    pub kind: ParamKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ParamOptions>,

    /// Lower bound, numeric kinds only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ParamValue>,

    /// Upper bound, numeric kinds only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ParamValue>,

    /// Increment; only set together with both bounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<ParamValue>,

    /// Display label, defaults to `name`
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ParameterDescriptor {
    /// Whether both numeric bounds are present.
    pub fn is_bounded(&self) -> bool {
        self.min.is_some() && self.max.is_some()
    }
}

/// Parse and validate one raw descriptor.
///
/// Fails with a [`ValidationError`] naming the offending field.
pub fn parse_descriptor(raw: &JsonValue) -> Result<ParameterDescriptor, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ValidationError::new("descriptor", "expected an object"))?;

    let name = parse_name(obj)?;

    if !obj.contains_key("value") {
        return Err(ValidationError::new("value", "missing required field"));
    }

    if let Err(violations) = validate_descriptor_schema(raw) {
        let first = &violations[0];
        return Err(ValidationError::new(first.field.clone(), first.message.clone()));
    }

    let value = parse_value(&obj["value"])?;
    let (value, kind) = apply_type_hint(obj, value)?;

    let options = match obj.get("options") {
        Some(raw_options) => Some(parse_options(raw_options, kind)?),
        None => None,
    };

    let min = parse_bound(obj, "min", kind)?;
    let max = parse_bound(obj, "max", kind)?;
    let mut step = parse_bound(obj, "step", kind)?;

    if let (Some(lo), Some(hi)) = (&min, &max) {
        if compare_numbers(lo, hi) == Some(Ordering::Greater) {
            return Err(ValidationError::new(
                "min",
                format!("min ({}) is greater than max ({})", lo, hi),
            ));
        }
    }

    if let Some(s) = &step {
        if min.is_none() || max.is_none() {
            return Err(ValidationError::new("step", "step requires both min and max"));
        }
        if as_number(s) <= 0.0 {
            return Err(ValidationError::new("step", "step must be greater than zero"));
        }
    } else if kind == ParamKind::Integer && min.is_some() && max.is_some() {
        step = Some(ParamValue::Int(1));
    }

    let label = match obj.get("label").and_then(JsonValue::as_str) {
        Some(l) if !l.is_empty() => l.to_string(),
        _ => name.clone(),
    };
    let help = obj.get("help").and_then(JsonValue::as_str).map(str::to_string);

    Ok(ParameterDescriptor {
        name,
        value,
        kind,
        options,
        min,
        max,
        step,
        label,
        help,
    })
}

/// Parse a whole `interactive` list, rejecting duplicate names.
pub fn parse_interactive(raw: &JsonValue) -> Result<Vec<ParameterDescriptor>, ValidationError> {
    let entries = raw
        .as_array()
        .ok_or_else(|| ValidationError::new("interactive", "expected a list of descriptors"))?;

    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let descriptor = parse_descriptor(entry).map_err(|e| e.in_entry(index))?;
        if !seen.insert(descriptor.name.clone()) {
            return Err(ValidationError::new(
                "name",
                format!("duplicate parameter name '{}'", descriptor.name),
            )
            .in_entry(index));
        }
        descriptors.push(descriptor);
    }

    tracing::debug!(count = descriptors.len(), "Parsed interactive parameters");
    Ok(descriptors)
}

fn parse_name(obj: &Map<String, JsonValue>) -> Result<String, ValidationError> {
    let name = match obj.get("name") {
        None => return Err(ValidationError::new("name", "missing required field")),
        Some(JsonValue::String(s)) => s,
        Some(_) => return Err(ValidationError::new("name", "must be a string")),
    };

    if !is_identifier(name) {
        return Err(ValidationError::new(
            "name",
            format!("'{}' is not a valid identifier", name),
        ));
    }

    Ok(name.clone())
}

fn parse_value(raw: &JsonValue) -> Result<ParamValue, ValidationError> {
    ParamValue::from_json(raw)
        .ok_or_else(|| ValidationError::new("value", "must be a boolean, string, integer or float"))
}

fn apply_type_hint(
    obj: &Map<String, JsonValue>,
    value: ParamValue,
) -> Result<(ParamValue, ParamKind), ValidationError> {
    let Some(hint) = obj.get("type").and_then(JsonValue::as_str) else {
        let kind = value.kind();
        return Ok((value, kind));
    };

    let kind: ParamKind = hint.parse().map_err(|e: String| ValidationError::new("type", e))?;
    let coerced = value.coerce_to(kind).ok_or_else(|| {
        ValidationError::new(
            "type",
            format!("declared type '{}' does not match value of type '{}'", kind, value.kind()),
        )
    })?;

    Ok((coerced, kind))
}

fn parse_options(raw: &JsonValue, kind: ParamKind) -> Result<ParamOptions, ValidationError> {
    let items = raw
        .as_array()
        .ok_or_else(|| ValidationError::new("options", "expected a list"))?;

    if items.is_empty() {
        return Err(ValidationError::new("options", "must not be empty"));
    }

    let labelled = items[0].is_array();
    if items.iter().any(|item| item.is_array() != labelled) {
        return Err(ValidationError::new(
            "options",
            "cannot mix bare values and (label, value) pairs",
        ));
    }

    if labelled {
        let mut pairs = Vec::with_capacity(items.len());
        for item in items {
            let (label, value) = match item.as_array().map(Vec::as_slice) {
                Some([JsonValue::String(label), value]) => (label.clone(), value),
                _ => {
                    return Err(ValidationError::new(
                        "options",
                        "each pair must be [label, value] with a string label",
                    ))
                }
            };
            pairs.push((label, option_value(value, kind)?));
        }
        Ok(ParamOptions::Labelled(pairs))
    } else {
        let values = items
            .iter()
            .map(|item| option_value(item, kind))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ParamOptions::Values(values))
    }
}

fn option_value(raw: &JsonValue, kind: ParamKind) -> Result<ParamValue, ValidationError> {
    let value = ParamValue::from_json(raw)
        .ok_or_else(|| ValidationError::new("options", "option values must be scalars"))?;
    value.coerce_to(kind).ok_or_else(|| {
        ValidationError::new(
            "options",
            format!("option {} is not compatible with a {} parameter", raw, kind),
        )
    })
}

fn parse_bound(
    obj: &Map<String, JsonValue>,
    field: &str,
    kind: ParamKind,
) -> Result<Option<ParamValue>, ValidationError> {
    let Some(raw) = obj.get(field) else {
        return Ok(None);
    };

    if !kind.is_numeric() {
        return Err(ValidationError::new(
            field,
            format!("only integer and float parameters accept {}", field),
        ));
    }

    let bound = ParamValue::from_json(raw)
        .and_then(|v| v.coerce_to(kind))
        .ok_or_else(|| {
            ValidationError::new(field, format!("must be a {} to match the value", kind))
        })?;

    Ok(Some(bound))
}

/// Integers compare exactly; anything else goes through `f64`.
fn compare_numbers(a: &ParamValue, b: &ParamValue) -> Option<Ordering> {
    match (a, b) {
        (ParamValue::Int(x), ParamValue::Int(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn as_number(value: &ParamValue) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_descriptor() {
        let d = parse_descriptor(&json!({"name": "show_grid", "value": false})).unwrap();
        assert_eq!(d.kind, ParamKind::Boolean);
        assert_eq!(d.label, "show_grid");
        assert!(d.options.is_none());
        assert!(d.step.is_none());
    }

    #[test]
    fn test_bounded_integer_gets_default_step() {
        let d = parse_descriptor(&json!({"name": "count", "value": 5, "min": 0, "max": 10})).unwrap();
        assert_eq!(d.kind, ParamKind::Integer);
        assert_eq!(d.min, Some(ParamValue::Int(0)));
        assert_eq!(d.max, Some(ParamValue::Int(10)));
        assert_eq!(d.step, Some(ParamValue::Int(1)));
    }

    #[test]
    fn test_bounded_float_has_no_default_step() {
        let d = parse_descriptor(&json!({"name": "alpha", "value": 0.5, "min": 0, "max": 1})).unwrap();
        assert_eq!(d.kind, ParamKind::Float);
        assert_eq!(d.min, Some(ParamValue::Float(0.0)));
        assert!(d.step.is_none());
    }

    #[test]
    fn test_missing_name() {
        let err = parse_descriptor(&json!({"value": 1})).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn test_name_must_be_identifier() {
        for bad in ["1count", "my-count", "has space", ""] {
            let err = parse_descriptor(&json!({"name": bad, "value": 1})).unwrap_err();
            assert_eq!(err.field, "name", "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_missing_value() {
        let err = parse_descriptor(&json!({"name": "count"})).unwrap_err();
        assert_eq!(err.field, "value");
    }

    #[test]
    fn test_mixed_options_rejected() {
        let err = parse_descriptor(&json!({
            "name": "color",
            "value": "red",
            "options": ["red", ["Green", "green"]]
        }))
        .unwrap_err();
        assert_eq!(err.field, "options");
        assert!(err.reason.contains("mix"));
    }

    #[test]
    fn test_labelled_options() {
        let d = parse_descriptor(&json!({
            "name": "color",
            "value": "r",
            "options": [["Red", "r"], ["Blue", "b"]]
        }))
        .unwrap();
        let pairs = d.options.unwrap().pairs();
        assert_eq!(pairs[1], ("Blue".to_string(), ParamValue::from("b")));
    }

    #[test]
    fn test_incompatible_option_rejected() {
        let err = parse_descriptor(&json!({
            "name": "size",
            "value": 3,
            "options": [1, 2, "large"]
        }))
        .unwrap_err();
        assert_eq!(err.field, "options");
    }

    #[test]
    fn test_min_greater_than_max() {
        let err = parse_descriptor(&json!({"name": "n", "value": 1, "min": 5, "max": 2})).unwrap_err();
        assert_eq!(err.field, "min");
    }

    #[test]
    fn test_min_greater_than_max_beyond_f64_precision() {
        let err = parse_descriptor(&json!({
            "name": "n",
            "value": 0,
            "min": 9_007_199_254_740_993i64,
            "max": 9_007_199_254_740_992i64
        }))
        .unwrap_err();
        assert_eq!(err.field, "min");

        let d = parse_descriptor(&json!({
            "name": "n",
            "value": 0,
            "min": 9_007_199_254_740_992i64,
            "max": 9_007_199_254_740_993i64
        }))
        .unwrap();
        assert!(d.is_bounded());
    }

    #[test]
    fn test_min_equal_max_accepted() {
        let d = parse_descriptor(&json!({"name": "n", "value": 3, "min": 3, "max": 3})).unwrap();
        assert!(d.is_bounded());
    }

    #[test]
    fn test_step_requires_both_bounds() {
        let err = parse_descriptor(&json!({"name": "n", "value": 1, "min": 0, "step": 2})).unwrap_err();
        assert_eq!(err.field, "step");
        let err = parse_descriptor(&json!({"name": "n", "value": 1, "step": 2})).unwrap_err();
        assert_eq!(err.field, "step");
    }

    #[test]
    fn test_step_must_be_positive() {
        let err = parse_descriptor(&json!({"name": "n", "value": 1, "min": 0, "max": 4, "step": 0}))
            .unwrap_err();
        assert_eq!(err.field, "step");
    }

    #[test]
    fn test_bounds_rejected_on_string() {
        let err = parse_descriptor(&json!({"name": "title", "value": "x", "max": 3})).unwrap_err();
        assert_eq!(err.field, "max");
    }

    #[test]
    fn test_integer_bound_must_be_integral() {
        let err = parse_descriptor(&json!({"name": "n", "value": 1, "min": 0.5, "max": 4})).unwrap_err();
        assert_eq!(err.field, "min");
    }

    #[test]
    fn test_type_hint_widens_integer() {
        let d = parse_descriptor(&json!({"name": "scale", "value": 1, "type": "float"})).unwrap();
        assert_eq!(d.kind, ParamKind::Float);
        assert_eq!(d.value, ParamValue::Float(1.0));
    }

    #[test]
    fn test_type_hint_mismatch() {
        let err = parse_descriptor(&json!({"name": "flag", "value": "yes", "type": "boolean"})).unwrap_err();
        assert_eq!(err.field, "type");
    }

    #[test]
    fn test_label_and_help() {
        let d = parse_descriptor(&json!({
            "name": "n",
            "value": 1,
            "label": "Number of rows",
            "help": "Rows to preview"
        }))
        .unwrap();
        assert_eq!(d.label, "Number of rows");
        assert_eq!(d.help.as_deref(), Some("Rows to preview"));
    }

    #[test]
    fn test_interactive_duplicate_names() {
        let err = parse_interactive(&json!([
            {"name": "a", "value": 1},
            {"name": "a", "value": 2}
        ]))
        .unwrap_err();
        assert_eq!(err.field, "interactive[1].name");
    }

    #[test]
    fn test_interactive_error_points_at_entry() {
        let err = parse_interactive(&json!([
            {"name": "a", "value": 1},
            {"name": "b", "value": 1, "min": 9, "max": 1}
        ]))
        .unwrap_err();
        assert_eq!(err.field, "interactive[1].min");
    }

    #[test]
    fn test_interactive_must_be_list() {
        let err = parse_interactive(&json!({"name": "a"})).unwrap_err();
        assert_eq!(err.field, "interactive");
    }
}
