//! Built-in HTML preview of the head of a text output file.

use serde_json::{json, Value as JsonValue};

use super::{InvocationContext, ProviderError, ProviderMetadata, ViewProvider};
use crate::invocation::{InvocationState, ParameterField};
use crate::types::DisplayType;

const DEFAULT_LINES: i64 = 20;
const MAX_LINES: i64 = 500;

/// Renders the first lines of the output file in a `<pre>` block.
///
/// Interactive parameters: `lines` (stepper, at least 1, clamped to 500
/// when invoked) and `wrap` (checkbox).
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPreviewProvider;

impl ViewProvider for TextPreviewProvider {
    fn describe(&self) -> ProviderMetadata {
        ProviderMetadata::new(DisplayType::Html, "Text preview")
            .immediate(true)
            .parameter(ParameterField::new("lines", DEFAULT_LINES))
            .parameter(ParameterField::new("wrap", false))
    }

    fn generate(
        &self,
        context: &InvocationContext,
        params: &InvocationState,
    ) -> Result<JsonValue, ProviderError> {
        let file = context
            .output_file
            .as_ref()
            .ok_or(ProviderError::MissingOutputFile)?;

        let lines = params
            .get_int("lines")
            .unwrap_or(DEFAULT_LINES)
            .clamp(1, MAX_LINES);
        let wrap = params.get_bool("wrap").unwrap_or(false);

        let text = file.text();
        let head: Vec<&str> = text.lines().take(lines as usize).collect();
        let white_space = if wrap { "pre-wrap" } else { "pre" };
        let output = format!(
            "<pre style=\"white-space: {}\">{}</pre>",
            white_space,
            html_escape::encode_text(&head.join("\n"))
        );

        Ok(json!({
            "output": output,
            "interactive": [
                {
                    "name": "lines",
                    "value": lines,
                    "min": 1,
                    "label": "Lines shown",
                },
                {
                    "name": "wrap",
                    "value": wrap,
                    "label": "Wrap long lines",
                },
            ],
        }))
    }
}
