//! Configuration loading from YAML/JSON.
//!
//! The configuration binds provider labels to provider references under a
//! named entry-point category, the same shape a Python package declares in
//! its `entry_points`:
//!
//! ```yaml
//! category: airavata.output_view_providers
//! portal_base_url: https://portal.example.org
//! entry_points:
//!   airavata.output_view_providers:
//!     text-preview: outview.providers:TextPreviewProvider
//!   airavata.djangoapp:
//!     dataparsers: dataparsers.apps:DataParsersConfig
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;
use thiserror::Error;

/// Category output view providers are registered under.
pub const DEFAULT_CATEGORY: &str = "airavata.output_view_providers";

lazy_static! {
    static ref LABEL_PATTERN: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap();

    /// `package.module:Class` or `package.module:Outer.Inner`
    static ref REFERENCE_PATTERN: Regex = Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*:[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$"
    ).unwrap();
}

/// Check whether `label` can name a provider.
pub fn is_valid_label(label: &str) -> bool {
    LABEL_PATTERN.is_match(label)
}

/// Check whether `reference` looks like `module:Class`.
pub fn is_valid_reference(reference: &str) -> bool {
    REFERENCE_PATTERN.is_match(reference)
}

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Registry and host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawConfig")]
pub struct OutviewConfig {
    /// Entry-point category holding output view providers
    pub category: String,

    /// Base URL for portal links such as file downloads
    pub portal_base_url: String,

    /// Category → label → provider reference
    pub entry_points: BTreeMap<String, BTreeMap<String, String>>,
}

/// Config as written, before duplicate keys are rejected.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_category")]
    category: String,

    #[serde(default)]
    portal_base_url: String,

    #[serde(default)]
    entry_points: Entries<Entries<String>>,
}

/// Map entries in document order, repeated keys included.
#[derive(Debug)]
struct Entries<V>(Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Entries<V> {
    /// Collect into a map; the first repeated key is the error.
    fn into_unique(self) -> Result<BTreeMap<String, V>, String> {
        let mut map = BTreeMap::new();
        for (key, value) in self.0 {
            if map.contains_key(&key) {
                return Err(key);
            }
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

impl TryFrom<RawConfig> for OutviewConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let categories = raw.entry_points.into_unique().map_err(|category| {
            ConfigError::ValidationError(format!("Duplicate category '{}'", category))
        })?;

        let mut entry_points = BTreeMap::new();
        for (category, labels) in categories {
            let labels = labels.into_unique().map_err(|label| {
                ConfigError::ValidationError(format!(
                    "Duplicate label '{}' in category {}",
                    label, category
                ))
            })?;
            entry_points.insert(category, labels);
        }

        let config = Self {
            category: raw.category,
            portal_base_url: raw.portal_base_url,
            entry_points,
        };
        config.validate()?;
        Ok(config)
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Default for OutviewConfig {
    fn default() -> Self {
        Self {
            category: default_category(),
            portal_base_url: String::new(),
            entry_points: BTreeMap::new(),
        }
    }
}

impl OutviewConfig {
    /// Parse config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        Self::try_from(raw)
    }

    /// Parse config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Parse config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse config from a file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    /// Label → reference bindings of the configured category.
    pub fn providers(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entry_points
            .get(&self.category)
            .into_iter()
            .flat_map(|entries| entries.iter())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.category.trim().is_empty() {
            return Err(ConfigError::MissingField("category".to_string()));
        }

        for (category, entries) in &self.entry_points {
            for (label, reference) in entries {
                if !is_valid_label(label) {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid label '{}' in category {}",
                        label, category
                    )));
                }
                if !is_valid_reference(reference) {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid reference '{}' for label '{}': expected module:Class",
                        reference, label
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONFIG: &str = r#"
portal_base_url: "https://portal.example.org"
entry_points:
  airavata.output_view_providers:
    text-preview: "outview.providers:TextPreviewProvider"
  airavata.djangoapp:
    dataparsers: "dataparsers.apps:DataParsersConfig"
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = OutviewConfig::from_yaml(VALID_CONFIG).unwrap();
        assert_eq!(config.category, DEFAULT_CATEGORY);
        assert_eq!(config.portal_base_url, "https://portal.example.org");
        let providers: Vec<_> = config.providers().collect();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].0, "text-preview");
    }

    #[test]
    fn test_other_categories_are_kept_separate() {
        let config = OutviewConfig::from_yaml(VALID_CONFIG).unwrap();
        assert!(config.providers().all(|(label, _)| label != "dataparsers"));
    }

    #[test]
    fn test_json_config() {
        let config = OutviewConfig::from_json(
            r#"{"entry_points": {"airavata.output_view_providers": {"plot": "pkg.views:Plot"}}}"#,
        )
        .unwrap();
        assert_eq!(config.providers().count(), 1);
    }

    #[test]
    fn test_duplicate_label_json() {
        let json = r#"{"entry_points": {"airavata.output_view_providers": {
            "plot": "pkg.views:One",
            "plot": "outview.providers:TextPreviewProvider"
        }}}"#;
        let err = OutviewConfig::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("'plot'")));
    }

    #[test]
    fn test_duplicate_label_yaml() {
        let yaml = r#"
entry_points:
  airavata.output_view_providers:
    plot: "pkg.views:One"
    plot: "outview.providers:TextPreviewProvider"
"#;
        assert!(matches!(
            OutviewConfig::from_yaml(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_same_label_in_other_category_is_fine() {
        let yaml = r#"
entry_points:
  airavata.output_view_providers:
    plot: "pkg.views:One"
  airavata.djangoapp:
    plot: "pkg.apps:PlotConfig"
"#;
        assert_eq!(OutviewConfig::from_yaml(yaml).unwrap().providers().count(), 1);
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        let value = serde_json::json!({"category": "", "entry_points": {}});
        assert!(serde_json::from_value::<OutviewConfig>(value).is_err());
    }

    #[test]
    fn test_invalid_reference() {
        let yaml = r#"
entry_points:
  airavata.output_view_providers:
    plot: "not a reference"
"#;
        assert!(matches!(
            OutviewConfig::from_yaml(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_invalid_label() {
        let yaml = r#"
entry_points:
  airavata.output_view_providers:
    "bad label": "pkg.views:Plot"
"#;
        assert!(OutviewConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_category() {
        assert!(matches!(
            OutviewConfig::from_yaml("category: \"\""),
            Err(ConfigError::MissingField(_))
        ));
    }

    #[test]
    fn test_reference_pattern() {
        assert!(is_valid_reference("gaussian_viewer.output_views:EigenvaluesViewProvider"));
        assert!(is_valid_reference("views:Outer.Inner"));
        assert!(!is_valid_reference("views.Plot"));
        assert!(!is_valid_reference(":Plot"));
    }
}
