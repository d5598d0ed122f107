//! The output view provider capability.
//!
//! Any type implementing [`ViewProvider`] can render an output file: it
//! describes itself once via [`ViewProvider::describe`] and produces a raw
//! result mapping on every invocation. The host validates that mapping with
//! [`crate::ViewProviderResult::from_value`].

mod default;
mod text_preview;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::invocation::{InvocationState, ParameterField, ParameterSchema};
use crate::parameter::ValidationError;
use crate::types::DisplayType;

pub use default::{download_link, DefaultViewProvider, DEFAULT_PROVIDER_LABEL};
pub use text_preview::TextPreviewProvider;

/// Errors raised by a provider while generating a result.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider requires an output file but none was given")]
    MissingOutputFile,

    #[error("Failed to read output file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Provider failed: {0}")]
    Failed(String),
}

/// Who is asking, and where the portal lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub username: Option<String>,

    /// Base URL used to build portal links (no trailing slash needed)
    #[serde(default)]
    pub portal_base_url: String,
}

/// Handle to the output file being visualized.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// File name shown to users
    pub name: String,

    /// Data product URI identifying the file in the portal
    pub data_product_uri: String,

    pub content: Vec<u8>,
}

impl OutputFile {
    pub fn new(
        name: impl Into<String>,
        data_product_uri: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            data_product_uri: data_product_uri.into(),
            content: content.into(),
        }
    }

    /// Load a local file, using a `file://` URI as its data product URI.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        let content = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            data_product_uri: format!("file://{}", path.display()),
            content,
        })
    }

    /// Content as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Everything a provider receives besides its keyword parameters.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub request: RequestContext,

    /// Name of the experiment output this view belongs to
    pub output_field: String,

    pub experiment_id: String,

    pub output_file: Option<OutputFile>,
}

/// Static description of a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderMetadata {
    pub display_type: DisplayType,

    /// Human-readable name
    pub name: String,

    /// Generate on page load rather than waiting for the user to ask
    pub immediate: bool,

    /// File to visualize when the real output file is unavailable
    pub test_output_file: Option<PathBuf>,

    /// Keyword parameters the provider accepts, with defaults
    pub parameters: Vec<ParameterField>,
}

impl ProviderMetadata {
    pub fn new(display_type: DisplayType, name: impl Into<String>) -> Self {
        Self {
            display_type,
            name: name.into(),
            immediate: false,
            test_output_file: None,
            parameters: Vec::new(),
        }
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    pub fn test_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.test_output_file = Some(path.into());
        self
    }

    pub fn parameter(mut self, field: ParameterField) -> Self {
        self.parameters.push(field);
        self
    }

    /// Typed schema of the declared parameters.
    pub fn schema(&self) -> Result<ParameterSchema, ValidationError> {
        ParameterSchema::new(self.parameters.clone())
    }
}

/// A plugin that renders a visualization for an output file.
pub trait ViewProvider: Send + Sync {
    fn describe(&self) -> ProviderMetadata;

    /// Produce the raw result mapping for the current parameter values.
    fn generate(
        &self,
        context: &InvocationContext,
        params: &InvocationState,
    ) -> Result<JsonValue, ProviderError>;
}
