//! Which providers an output file shows, and in what order.
//!
//! Application outputs carry a JSON metadata object such as
//! `{"output-view-providers": ["gaussian-eigenvalues", "default"]}`. The
//! first listed provider is shown initially. `default` is appended when it
//! is not listed so the download link stays reachable.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::provider::DEFAULT_PROVIDER_LABEL;
use crate::registry::ProviderRegistry;

/// Metadata key holding the ordered provider labels.
pub const OUTPUT_VIEW_PROVIDERS_KEY: &str = "output-view-providers";

/// Provider labels associated with an output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputViewMetadata {
    #[serde(rename = "output-view-providers", default)]
    pub providers: Vec<String>,
}

impl OutputViewMetadata {
    pub fn new(providers: Vec<String>) -> Self {
        Self { providers }
    }

    /// Read the labels from a metadata object.
    ///
    /// Missing or malformed metadata yields no labels; non-string entries
    /// are skipped.
    pub fn from_value(metadata: &JsonValue) -> Self {
        let Some(entries) = metadata.get(OUTPUT_VIEW_PROVIDERS_KEY) else {
            return Self::default();
        };

        let Some(entries) = entries.as_array() else {
            tracing::warn!(value = %entries, "Ignoring malformed output-view-providers metadata");
            return Self::default();
        };

        let providers = entries
            .iter()
            .filter_map(|entry| match entry.as_str() {
                Some(label) => Some(label.to_string()),
                None => {
                    tracing::warn!(entry = %entry, "Skipping non-string provider label");
                    None
                }
            })
            .collect();

        Self { providers }
    }

    /// Parse metadata stored as a JSON string.
    pub fn parse(metadata: &str) -> Self {
        match serde_json::from_str::<JsonValue>(metadata) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                tracing::warn!(error = %e, "Output metadata is not valid JSON");
                Self::default()
            }
        }
    }

    /// Resolve labels against a registry into a display order.
    pub fn resolve(&self, registry: &ProviderRegistry) -> ProviderSelection {
        let mut labels: Vec<String> = Vec::new();

        for label in &self.providers {
            if labels.contains(label) {
                continue;
            }
            if !registry.contains(label) {
                tracing::warn!(label = %label, "Skipping unregistered output view provider");
                continue;
            }
            labels.push(label.clone());
        }

        if !labels.iter().any(|l| l == DEFAULT_PROVIDER_LABEL) {
            labels.push(DEFAULT_PROVIDER_LABEL.to_string());
        }

        ProviderSelection { labels }
    }
}

/// Ordered providers for one output. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSelection {
    labels: Vec<String>,
}

impl ProviderSelection {
    /// Provider shown when the output is first displayed.
    pub fn initial(&self) -> &str {
        self.labels
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROVIDER_LABEL)
    }

    /// Provider to fall back to when another one fails.
    pub fn fallback(&self) -> &str {
        DEFAULT_PROVIDER_LABEL
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TextPreviewProvider;
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::default();
        registry
            .register("custom", "outview.providers:TextPreviewProvider", Arc::new(TextPreviewProvider))
            .unwrap();
        registry
    }

    #[test]
    fn test_custom_first_then_default() {
        let metadata = OutputViewMetadata::from_value(&json!({
            "output-view-providers": ["custom", "default"]
        }));
        let selection = metadata.resolve(&registry());
        assert_eq!(selection.initial(), "custom");
        assert_eq!(selection.fallback(), "default");
        assert!(selection.contains("default"));
        assert_eq!(selection.labels(), &["custom".to_string(), "default".to_string()]);
    }

    #[test]
    fn test_default_listed_first_wins() {
        let selection = OutputViewMetadata::new(vec!["default".into(), "custom".into()])
            .resolve(&registry());
        assert_eq!(selection.initial(), "default");
    }

    #[test]
    fn test_default_appended_when_missing() {
        let selection = OutputViewMetadata::new(vec!["custom".into()]).resolve(&registry());
        assert_eq!(selection.labels(), &["custom".to_string(), "default".to_string()]);
    }

    #[test]
    fn test_unregistered_labels_skipped() {
        let selection = OutputViewMetadata::new(vec!["missing".into(), "custom".into()])
            .resolve(&registry());
        assert_eq!(selection.initial(), "custom");
    }

    #[test]
    fn test_duplicates_collapse() {
        let selection = OutputViewMetadata::new(vec!["custom".into(), "custom".into()])
            .resolve(&registry());
        assert_eq!(selection.labels().len(), 2);
    }

    #[test]
    fn test_missing_or_malformed_metadata() {
        assert_eq!(
            OutputViewMetadata::from_value(&json!({})).resolve(&registry()).labels(),
            &["default".to_string()]
        );
        assert!(OutputViewMetadata::from_value(&json!({"output-view-providers": "custom"}))
            .providers
            .is_empty());
        assert!(OutputViewMetadata::parse("{not json").providers.is_empty());
    }

    #[test]
    fn test_parse_string_metadata() {
        let metadata = OutputViewMetadata::parse(r#"{"output-view-providers": ["custom"]}"#);
        assert_eq!(metadata.providers, vec!["custom".to_string()]);
    }
}
