//! UI control selection for interactive parameters.
//!
//! Every validated descriptor maps to exactly one control, by precedence:
//! 1. options present → select list, whatever the kind
//! 2. boolean → checkbox
//! 3. integer/float with both min and max → range slider
//! 4. integer/float → stepper (increment `step`, default 1)
//! 5. string → text input

use serde::{Deserialize, Serialize};

use crate::parameter::ParameterDescriptor;
use crate::types::{ControlKind, ParamKind, ParamValue};

/// A form control ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub kind: ControlKind,

    /// Parameter (and form field) name
    pub name: String,

    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Currently selected value
    pub value: ParamValue,

    /// Select-list entries as `(label, value)`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<(String, ParamValue)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ParamValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ParamValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<ParamValue>,
}

/// Pick the control kind for a descriptor.
pub fn select_control_kind(descriptor: &ParameterDescriptor) -> ControlKind {
    if descriptor.options.is_some() {
        return ControlKind::Select;
    }

    match descriptor.kind {
        ParamKind::Boolean => ControlKind::Checkbox,
        ParamKind::Integer | ParamKind::Float if descriptor.is_bounded() => ControlKind::RangeSlider,
        ParamKind::Integer | ParamKind::Float => ControlKind::Stepper,
        ParamKind::String => ControlKind::TextInput,
    }
}

/// Build the full control for a descriptor.
pub fn build_control(descriptor: &ParameterDescriptor) -> Control {
    let kind = select_control_kind(descriptor);
    tracing::debug!(parameter = %descriptor.name, control = ?kind, "Selected control");

    let mut control = Control {
        kind,
        name: descriptor.name.clone(),
        label: descriptor.label.clone(),
        help: descriptor.help.clone(),
        value: descriptor.value.clone(),
        options: Vec::new(),
        min: None,
        max: None,
        step: None,
    };

    match kind {
        ControlKind::Select => {
            control.options = descriptor
                .options
                .as_ref()
                .map(|o| o.pairs())
                .unwrap_or_default();
        }
        ControlKind::RangeSlider => {
            control.min = descriptor.min.clone();
            control.max = descriptor.max.clone();
            control.step = descriptor.step.clone();
        }
        ControlKind::Stepper => {
            control.min = descriptor.min.clone();
            control.max = descriptor.max.clone();
            control.step = Some(default_increment(descriptor.kind));
        }
        ControlKind::Checkbox | ControlKind::TextInput => {}
    }

    control
}

/// Build controls for a whole `interactive` list, keeping declaration order.
pub fn build_controls(descriptors: &[ParameterDescriptor]) -> Vec<Control> {
    descriptors.iter().map(build_control).collect()
}

fn default_increment(kind: ParamKind) -> ParamValue {
    match kind {
        ParamKind::Float => ParamValue::Float(1.0),
        _ => ParamValue::Int(1),
    }
}
