//! Provider registration under labels.
//!
//! Plugins bind a unique label to a provider reference (`module:Class`)
//! inside a named entry-point category. The registry resolves those
//! references against a [`ProviderCatalog`] of in-process providers. The
//! built-in download-link provider is always registered as `default`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{is_valid_label, OutviewConfig, DEFAULT_CATEGORY};
use crate::provider::{
    DefaultViewProvider, TextPreviewProvider, ViewProvider, DEFAULT_PROVIDER_LABEL,
};

/// Reference of the built-in download-link provider.
pub const DEFAULT_PROVIDER_REFERENCE: &str = "outview.providers:DefaultViewProvider";

/// Reference of the built-in text preview provider.
pub const TEXT_PREVIEW_REFERENCE: &str = "outview.providers:TextPreviewProvider";

/// Errors from building or querying the registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Provider label already registered: {0}")]
    DuplicateLabel(String),

    #[error("Invalid provider label: '{0}'")]
    InvalidLabel(String),

    #[error("Cannot resolve provider reference '{reference}' for label '{label}'")]
    UnknownReference { label: String, reference: String },

    #[error("No provider registered for label '{0}'")]
    NotFound(String),
}

/// Providers available in this process, keyed by reference.
#[derive(Default, Clone)]
pub struct ProviderCatalog {
    providers: BTreeMap<String, Arc<dyn ViewProvider>>,
}

impl ProviderCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in providers.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(DEFAULT_PROVIDER_REFERENCE, Arc::new(DefaultViewProvider));
        catalog.insert(TEXT_PREVIEW_REFERENCE, Arc::new(TextPreviewProvider));
        catalog
    }

    /// Add a provider under a reference, replacing any existing one.
    pub fn insert(&mut self, reference: impl Into<String>, provider: Arc<dyn ViewProvider>) {
        self.providers.insert(reference.into(), provider);
    }

    pub fn resolve(&self, reference: &str) -> Option<Arc<dyn ViewProvider>> {
        self.providers.get(reference).cloned()
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCatalog")
            .field("references", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A provider bound to a label.
#[derive(Clone)]
pub struct RegisteredProvider {
    pub label: String,
    pub reference: String,
    pub provider: Arc<dyn ViewProvider>,
}

impl fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("label", &self.label)
            .field("reference", &self.reference)
            .finish()
    }
}

/// Label → provider mapping for one entry-point category.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    category: String,
    providers: BTreeMap<String, RegisteredProvider>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY)
    }
}

impl ProviderRegistry {
    /// Create a registry holding only the `default` provider.
    pub fn new(category: impl Into<String>) -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            DEFAULT_PROVIDER_LABEL.to_string(),
            RegisteredProvider {
                label: DEFAULT_PROVIDER_LABEL.to_string(),
                reference: DEFAULT_PROVIDER_REFERENCE.to_string(),
                provider: Arc::new(DefaultViewProvider),
            },
        );
        Self {
            category: category.into(),
            providers,
        }
    }

    /// Build a registry from the configured category's entry points.
    ///
    /// Entries of other categories are ignored.
    pub fn from_config(
        config: &OutviewConfig,
        catalog: &ProviderCatalog,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(config.category.clone());

        for (label, reference) in config.providers() {
            let provider =
                catalog
                    .resolve(reference)
                    .ok_or_else(|| RegistryError::UnknownReference {
                        label: label.clone(),
                        reference: reference.clone(),
                    })?;
            registry.register(label.clone(), reference.clone(), provider)?;
        }

        for category in config.entry_points.keys().filter(|c| **c != config.category) {
            tracing::debug!(category = %category, "Skipping entry points of another category");
        }

        Ok(registry)
    }

    /// Register a provider under a unique label.
    pub fn register(
        &mut self,
        label: impl Into<String>,
        reference: impl Into<String>,
        provider: Arc<dyn ViewProvider>,
    ) -> Result<(), RegistryError> {
        let label = label.into();
        if !is_valid_label(&label) {
            return Err(RegistryError::InvalidLabel(label));
        }
        if self.providers.contains_key(&label) {
            return Err(RegistryError::DuplicateLabel(label));
        }

        let reference = reference.into();
        tracing::info!(label = %label, reference = %reference, "Registered output view provider");
        self.providers.insert(
            label.clone(),
            RegisteredProvider {
                label,
                reference,
                provider,
            },
        );
        Ok(())
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn get(&self, label: &str) -> Option<&RegisteredProvider> {
        self.providers.get(label)
    }

    /// Look up a provider, failing when the label is unknown.
    pub fn require(&self, label: &str) -> Result<Arc<dyn ViewProvider>, RegistryError> {
        self.providers
            .get(label)
            .map(|p| p.provider.clone())
            .ok_or_else(|| RegistryError::NotFound(label.to_string()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.providers.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::InvocationState;
    use crate::provider::{InvocationContext, ProviderError, ProviderMetadata};
    use crate::types::DisplayType;
    use serde_json::Value;

    struct MockLinkProvider;

    impl ViewProvider for MockLinkProvider {
        fn describe(&self) -> ProviderMetadata {
            ProviderMetadata::new(DisplayType::Link, "Mock")
        }

        fn generate(
            &self,
            _context: &InvocationContext,
            _params: &InvocationState,
        ) -> Result<Value, ProviderError> {
            Ok(serde_json::json!({"url": "https://example.org", "label": "Mock"}))
        }
    }

    #[test]
    fn test_new_registry_has_default() {
        let registry = ProviderRegistry::default();
        assert!(registry.contains("default"));
        assert_eq!(registry.category(), DEFAULT_CATEGORY);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_and_require() {
        let mut registry = ProviderRegistry::default();
        registry
            .register("mock", "tests.views:MockLinkProvider", Arc::new(MockLinkProvider))
            .unwrap();
        let provider = registry.require("mock").unwrap();
        assert_eq!(provider.describe().name, "Mock");
        assert_eq!(
            registry.get("mock").unwrap().reference,
            "tests.views:MockLinkProvider"
        );
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut registry = ProviderRegistry::default();
        let err = registry
            .register("default", "tests.views:MockLinkProvider", Arc::new(MockLinkProvider))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateLabel("default".into()));
    }

    #[test]
    fn test_unknown_label() {
        let registry = ProviderRegistry::default();
        assert!(matches!(registry.require("nope"), Err(RegistryError::NotFound(_))));
    }

    #[test]
    fn test_from_config_resolves_catalog() {
        let config = OutviewConfig::from_yaml(
            r#"
entry_points:
  airavata.output_view_providers:
    text-preview: "outview.providers:TextPreviewProvider"
  airavata.djangoapp:
    other: "other.apps:OtherConfig"
"#,
        )
        .unwrap();
        let registry = ProviderRegistry::from_config(&config, &ProviderCatalog::builtin()).unwrap();
        let labels: Vec<_> = registry.labels().collect();
        assert_eq!(labels, vec!["default", "text-preview"]);
    }

    #[test]
    fn test_from_config_unknown_reference() {
        let config = OutviewConfig::from_yaml(
            r#"
entry_points:
  airavata.output_view_providers:
    plot: "missing.views:Plot"
"#,
        )
        .unwrap();
        let err = ProviderRegistry::from_config(&config, &ProviderCatalog::builtin()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownReference { .. }));
    }
}
