//! Invocation adapter: keyword arguments for the next provider call.
//!
//! Providers are stateless between calls. The host keeps an
//! [`InvocationState`] per displayed output and, on each user edit, merges
//! the edited values over it to produce the full keyword arguments of the
//! next invocation. A rejected update never touches the previous state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::parameter::{is_identifier, ParameterDescriptor, ValidationError};
use crate::types::{ParamKind, ParamValue};

/// Errors from applying an update.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Type mismatch for parameter {name}: expected {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: ParamKind,
        found: ParamKind,
    },
}

/// A typed, defaulted keyword parameter accepted by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterField {
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParameterField {
    /// Field whose kind is inferred from the default.
    pub fn new(name: impl Into<String>, default: impl Into<ParamValue>) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            kind: default.kind(),
            default,
        }
    }

    /// Float field with a default given as any numeric value.
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Float,
            default: ParamValue::Float(default),
        }
    }
}

/// Ordered set of parameters a provider accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    fields: Vec<ParameterField>,
}

impl ParameterSchema {
    /// Build a schema, rejecting invalid or duplicate names.
    pub fn new(fields: Vec<ParameterField>) -> Result<Self, ValidationError> {
        let mut schema = Self::default();
        for field in fields {
            schema.push(field)?;
        }
        Ok(schema)
    }

    /// Schema declared by an `interactive` list, using current values as defaults.
    pub fn from_descriptors(descriptors: &[ParameterDescriptor]) -> Result<Self, ValidationError> {
        Self::new(
            descriptors
                .iter()
                .map(|d| ParameterField {
                    name: d.name.clone(),
                    kind: d.kind,
                    default: d.value.clone(),
                })
                .collect(),
        )
    }

    fn push(&mut self, field: ParameterField) -> Result<(), ValidationError> {
        if !is_identifier(&field.name) {
            return Err(ValidationError::new(
                "name",
                format!("'{}' is not a valid identifier", field.name),
            ));
        }
        if self.get(&field.name).is_some() {
            return Err(ValidationError::new(
                "name",
                format!("duplicate parameter name '{}'", field.name),
            ));
        }
        let Some(default) = field.default.coerce_to(field.kind) else {
            return Err(ValidationError::new(
                "default",
                format!("default for '{}' is not a {}", field.name, field.kind),
            ));
        };
        self.fields.push(ParameterField { default, ..field });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> &[ParameterField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// State holding every declared default.
    pub fn defaults(&self) -> InvocationState {
        InvocationState {
            values: self
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.default.clone()))
                .collect(),
        }
    }
}

/// Current value of every parameter, as passed to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationState {
    values: BTreeMap<String, ParamValue>,
}

impl InvocationState {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keyword arguments as a JSON object.
    pub fn to_kwargs(&self) -> Map<String, JsonValue> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    /// Typed lookup helpers for provider implementations.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ParamValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ParamValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(ParamValue::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Str(s)) => Some(s),
            _ => None,
        }
    }
}

/// Values changed by one user edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterUpdate {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update touching a single parameter.
    pub fn single(name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self::new().set(name, value)
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Union of two updates; entries of `other` win on overlap.
    pub fn merge(&self, other: &ParameterUpdate) -> ParameterUpdate {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        ParameterUpdate { values }
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build an update from a submitted JSON object.
    pub fn from_json(object: &Map<String, JsonValue>) -> Result<Self, ValidationError> {
        let mut update = Self::new();
        for (name, raw) in object {
            let value = ParamValue::from_json(raw).ok_or_else(|| {
                ValidationError::new(name.clone(), "must be a boolean, string, integer or float")
            })?;
            update.values.insert(name.clone(), value);
        }
        Ok(update)
    }
}

/// Merges user edits into invocation state for one provider.
#[derive(Debug, Clone, Default)]
pub struct InvocationAdapter {
    schema: ParameterSchema,
}

impl InvocationAdapter {
    pub fn new(schema: ParameterSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    /// State for the first invocation.
    pub fn initial_state(&self) -> InvocationState {
        self.schema.defaults()
    }

    /// Apply one update to `state` (or to the defaults when there is none).
    ///
    /// Every entry is checked before anything is merged, so an error means
    /// nothing changed.
    pub fn apply(
        &self,
        state: Option<&InvocationState>,
        update: &ParameterUpdate,
    ) -> Result<InvocationState, InvocationError> {
        let mut checked = Vec::with_capacity(update.values.len());
        for (name, value) in &update.values {
            let field = self.schema.get(name).ok_or_else(|| {
                tracing::warn!(parameter = %name, "Rejected update for unknown parameter");
                InvocationError::UnknownParameter { name: name.clone() }
            })?;
            checked.push((name.clone(), coerce_field(field, value, "update")?));
        }

        // Prior values must still fit the schema; values the update replaces
        // are not checked.
        let mut next = self.initial_state();
        if let Some(previous) = state {
            for (name, value) in previous.iter() {
                if update.values.contains_key(name) {
                    continue;
                }
                if let Some(field) = self.schema.get(name) {
                    next.values.insert(name.clone(), coerce_field(field, value, "prior state")?);
                }
            }
        }
        next.values.extend(checked);
        Ok(next)
    }

    /// Apply updates in order.
    pub fn apply_all(
        &self,
        state: Option<&InvocationState>,
        updates: &[ParameterUpdate],
    ) -> Result<InvocationState, InvocationError> {
        let mut current = match state {
            Some(s) => self.apply(Some(s), &ParameterUpdate::new())?,
            None => self.initial_state(),
        };
        for update in updates {
            current = self.apply(Some(&current), update)?;
        }
        Ok(current)
    }
}

fn coerce_field(
    field: &ParameterField,
    value: &ParamValue,
    source: &str,
) -> Result<ParamValue, InvocationError> {
    value.coerce_to(field.kind).ok_or_else(|| {
        tracing::warn!(
            parameter = %field.name,
            expected = %field.kind,
            found = %value.kind(),
            source,
            "Rejected value with mismatched type"
        );
        InvocationError::TypeMismatch {
            name: field.name.clone(),
            expected: field.kind,
            found: value.kind(),
        }
    })
}
