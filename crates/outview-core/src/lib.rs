//! # outview-core
//!
//! The contract between a science-gateway portal and its output view
//! providers.
//!
//! A provider renders an output file as a link, an image or a chunk of
//! HTML, and may declare *interactive parameters* that the portal turns
//! into form controls. When the user edits a control the provider is
//! invoked again with the full set of current values.
//!
//! This crate covers that contract:
//! - validating interactive parameter declarations ([`parameter`])
//! - choosing a form control for each one ([`control`])
//! - computing the next invocation's keyword arguments ([`invocation`])
//! - validating results per display type ([`result`])
//! - registering providers and ordering them per output ([`registry`],
//!   [`association`])
//! - the render/edit lifecycle with download-link fallback ([`session`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use outview_core::{check_result, DisplayType};
//!
//! let raw = serde_json::json!({
//!     "output": "<div id='plot'></div>",
//!     "interactive": [{"name": "show_grid", "value": false}]
//! });
//! let checked = check_result(DisplayType::Html, &raw)?;
//! assert_eq!(checked.controls[0].kind, ControlKind::Checkbox);
//! ```

pub mod association;
pub mod config;
pub mod control;
pub mod invocation;
pub mod parameter;
pub mod provider;
pub mod registry;
pub mod result;
pub mod session;
pub mod types;

// Re-export main types at crate root
pub use association::{OutputViewMetadata, ProviderSelection, OUTPUT_VIEW_PROVIDERS_KEY};
pub use config::{ConfigError, OutviewConfig, DEFAULT_CATEGORY};
pub use control::{build_control, build_controls, select_control_kind, Control};
pub use invocation::{
    InvocationAdapter, InvocationError, InvocationState, ParameterField, ParameterSchema,
    ParameterUpdate,
};
pub use parameter::{
    parse_descriptor, parse_interactive, ParamOptions, ParameterDescriptor, ValidationError,
};
pub use provider::{
    DefaultViewProvider, InvocationContext, OutputFile, ProviderError, ProviderMetadata,
    RequestContext, TextPreviewProvider, ViewProvider, DEFAULT_PROVIDER_LABEL,
};
pub use registry::{ProviderCatalog, ProviderRegistry, RegisteredProvider, RegistryError};
pub use result::{ResultError, ViewPayload, ViewProviderResult};
pub use session::{RenderedView, ViewSession};
pub use types::{ControlKind, DisplayType, ParamKind, ParamValue};

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors surfaced at the library boundary.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Result(#[from] ResultError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A validated result together with its form controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckedResult {
    pub result: ViewProviderResult,
    pub controls: Vec<Control>,
}

/// Validate a raw provider result and select controls for its parameters.
///
/// This is the render-time check a host runs on every provider response.
pub fn check_result(display_type: DisplayType, raw: &JsonValue) -> Result<CheckedResult, ViewError> {
    let result = ViewProviderResult::from_value(display_type, raw)?;
    let controls = result.controls();
    Ok(CheckedResult { result, controls })
}

/// Next invocation state for a result's interactive parameters.
///
/// The schema comes from the descriptors themselves, with their current
/// values as the starting state unless `state` is given.
pub fn next_state(
    result: &ViewProviderResult,
    state: Option<&InvocationState>,
    update: &ParameterUpdate,
) -> Result<InvocationState, ViewError> {
    let adapter = InvocationAdapter::new(ParameterSchema::from_descriptors(&result.interactive)?);
    Ok(adapter.apply(state, update)?)
}
