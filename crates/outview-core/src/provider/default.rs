//! Built-in download-link provider.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::{json, Value as JsonValue};

use super::{InvocationContext, ProviderError, ProviderMetadata, ViewProvider};
use crate::invocation::InvocationState;
use crate::result::ViewPayload;
use crate::types::DisplayType;

/// Label the download-link provider is always registered under.
pub const DEFAULT_PROVIDER_LABEL: &str = "default";

/// Download link for the context's output file, if there is one.
pub fn download_link(context: &InvocationContext) -> Option<ViewPayload> {
    let file = context.output_file.as_ref()?;
    let base = context.request.portal_base_url.trim_end_matches('/');
    Some(ViewPayload::Link {
        url: format!(
            "{}/sdk/download/?data-product-uri={}",
            base,
            utf8_percent_encode(&file.data_product_uri, NON_ALPHANUMERIC)
        ),
        label: file.name.clone(),
    })
}

/// Shows a link to download the output file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultViewProvider;

impl ViewProvider for DefaultViewProvider {
    fn describe(&self) -> ProviderMetadata {
        ProviderMetadata::new(DisplayType::Link, "Download").immediate(true)
    }

    fn generate(
        &self,
        context: &InvocationContext,
        _params: &InvocationState,
    ) -> Result<JsonValue, ProviderError> {
        match download_link(context) {
            Some(ViewPayload::Link { url, label }) => Ok(json!({ "url": url, "label": label })),
            _ => Err(ProviderError::MissingOutputFile),
        }
    }
}
