//! View lifecycle for one displayed output.
//!
//! ```text
//! Uninitialized --render--> Rendered(defaults) --edit--> Rendered(updated) --edit--> ...
//! ```
//!
//! A session owns the invocation state. Rejected edits leave it untouched.
//! When the provider fails or returns an incomplete result, the session
//! shows the download link with an inline error and keeps the last good
//! state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::control::Control;
use crate::invocation::{InvocationAdapter, InvocationState, ParameterUpdate};
use crate::parameter::ValidationError;
use crate::provider::{download_link, InvocationContext, OutputFile, ProviderMetadata, ViewProvider};
use crate::registry::ProviderRegistry;
use crate::result::{ResultError, ViewPayload, ViewProviderResult};
use crate::ViewError;

/// What the host displays after an invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    /// Label of the provider that was invoked
    pub label: String,

    /// Content to show; `None` when the provider failed and there is no
    /// output file to link to
    pub payload: Option<ViewPayload>,

    pub controls: Vec<Control>,

    /// Keyword arguments of the invocation that produced this view
    pub state: InvocationState,

    /// Inline error shown to the user when the provider failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub rendered_at: DateTime<Utc>,
}

impl RenderedView {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// The `Rendered` phase; a session without one is `Uninitialized`.
#[derive(Debug, Clone)]
struct Rendered {
    state: InvocationState,
    view: RenderedView,
}

/// Host-side lifecycle of one provider's view of one output.
pub struct ViewSession {
    label: String,
    provider: Arc<dyn ViewProvider>,
    metadata: ProviderMetadata,
    adapter: InvocationAdapter,
    context: InvocationContext,
    rendered: Option<Rendered>,
}

impl ViewSession {
    /// Create a session; fails if the provider declares an invalid schema.
    pub fn new(
        label: impl Into<String>,
        provider: Arc<dyn ViewProvider>,
        context: InvocationContext,
    ) -> Result<Self, ViewError> {
        let metadata = provider.describe();
        let adapter = InvocationAdapter::new(metadata.schema()?);
        Ok(Self {
            label: label.into(),
            provider,
            metadata,
            adapter,
            context,
            rendered: None,
        })
    }

    /// Create a session for a registered provider.
    pub fn from_registry(
        registry: &ProviderRegistry,
        label: &str,
        context: InvocationContext,
    ) -> Result<Self, ViewError> {
        let provider = registry.require(label)?;
        Self::new(label, provider, context)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered.is_some()
    }

    /// Current invocation state, once rendered.
    pub fn state(&self) -> Option<&InvocationState> {
        self.rendered.as_ref().map(|r| &r.state)
    }

    pub fn view(&self) -> Option<&RenderedView> {
        self.rendered.as_ref().map(|r| &r.view)
    }

    /// Invoke with the current state, or with defaults on first render.
    pub fn render(&mut self) -> Result<&RenderedView, ViewError> {
        let state = match &self.rendered {
            None => self.adapter.initial_state(),
            Some(rendered) => rendered.state.clone(),
        };
        self.invoke(state)
    }

    /// Apply one user edit and re-invoke.
    ///
    /// An unknown name or mismatched type is returned as an error and the
    /// session keeps its previous state and view.
    pub fn edit(&mut self, update: &ParameterUpdate) -> Result<&RenderedView, ViewError> {
        let next = self.adapter.apply(self.state(), update)?;
        self.invoke(next)
    }

    fn invoke(&mut self, state: InvocationState) -> Result<&RenderedView, ViewError> {
        let context = self.effective_context();

        let raw = match self.provider.generate(&context, &state) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(label = %self.label, error = %e, "Provider failed, showing download link");
                return Ok(self.fallback(&context, state, e.to_string()));
            }
        };

        let result = match ViewProviderResult::from_value(self.metadata.display_type, &raw) {
            Ok(result) => result,
            Err(ResultError::Parameter(e)) => return Err(ViewError::Validation(e)),
            Err(e) => {
                tracing::warn!(label = %self.label, error = %e, "Invalid provider result, showing download link");
                return Ok(self.fallback(&context, state, e.to_string()));
            }
        };

        for (index, descriptor) in result.interactive.iter().enumerate() {
            let Some(field) = self.adapter.schema().get(&descriptor.name) else {
                return Err(ViewError::Validation(ValidationError::new(
                    format!("interactive[{}].name", index),
                    format!("provider does not accept parameter '{}'", descriptor.name),
                )));
            };
            // An integer control for a float parameter still yields valid edits.
            if descriptor.value.coerce_to(field.kind).is_none() {
                return Err(ViewError::Validation(ValidationError::new(
                    format!("interactive[{}].value", index),
                    format!(
                        "parameter '{}' is declared as {} but shown as {}",
                        descriptor.name, field.kind, descriptor.kind
                    ),
                )));
            }
        }

        let view = RenderedView {
            label: self.label.clone(),
            controls: result.controls(),
            payload: Some(result.payload),
            state: state.clone(),
            error: None,
            rendered_at: Utc::now(),
        };
        let rendered = self.rendered.insert(Rendered { state, view });
        Ok(&rendered.view)
    }

    /// Show the download link with an inline error, keeping the last good
    /// state (or the attempted one on first render).
    fn fallback(
        &mut self,
        context: &InvocationContext,
        attempted: InvocationState,
        message: String,
    ) -> &RenderedView {
        let state = match &self.rendered {
            None => attempted,
            Some(rendered) => rendered.state.clone(),
        };
        let view = RenderedView {
            label: self.label.clone(),
            payload: download_link(context),
            controls: Vec::new(),
            state: state.clone(),
            error: Some(message),
            rendered_at: Utc::now(),
        };
        let rendered = self.rendered.insert(Rendered { state, view });
        &rendered.view
    }

    /// Context with the test output file swapped in when the real one is
    /// missing.
    fn effective_context(&self) -> InvocationContext {
        let mut context = self.context.clone();
        if context.output_file.is_none() {
            if let Some(path) = &self.metadata.test_output_file {
                match OutputFile::from_path(path) {
                    Ok(file) => context.output_file = Some(file),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to load test output file")
                    }
                }
            }
        }
        context
    }
}
