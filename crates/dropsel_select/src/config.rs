//! Dropdown configuration surface
//!
//! Every field is optional in the serialized form. A config can be built in
//! code with the builder methods or read from TOML or JSON:
//!
//! ```
//! use dropsel_select::config::DropdownConfig;
//!
//! let config = DropdownConfig::from_toml_str(r#"
//!     searchable = true
//!     placeholder = "Pick a city"
//!     content = [{ value = "zh", label = "Zürich" }]
//! "#).unwrap();
//!
//! assert!(config.searchable);
//! assert!(!config.multiple);
//! assert_eq!(config.content.as_ref().map(Vec::len), Some(1));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::normalize::FieldSelectors;
use crate::selection::SelectionMode;
use crate::typeahead::DEFAULT_QUIET_INTERVAL;

/// Errors reading a [`DropdownConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error when reading the file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension is neither .toml nor .json
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// Configuration of one dropdown instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropdownConfig {
    /// Array-mode records. When present, declarative children are ignored.
    pub content: Option<Vec<Value>>,
    pub value_field: String,
    pub label_field: String,
    pub multiple: bool,
    pub searchable: bool,
    pub disabled: bool,
    /// Shown by `display_text` when nothing is selected
    pub placeholder: String,
    pub typeahead_quiet_ms: u64,
}

impl Default for DropdownConfig {
    fn default() -> Self {
        let fields = FieldSelectors::default();
        Self {
            content: None,
            value_field: fields.value_field,
            label_field: fields.label_field,
            multiple: false,
            searchable: false,
            disabled: false,
            placeholder: String::new(),
            typeahead_quiet_ms: DEFAULT_QUIET_INTERVAL.as_millis() as u64,
        }
    }
}

impl DropdownConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Read a `.toml` or `.json` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let parse: fn(&str) -> Result<Self, ConfigError> =
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => Self::from_toml_str,
                Some("json") => Self::from_json_str,
                _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
            };
        let source = std::fs::read_to_string(path)?;
        parse(&source)
    }

    pub fn content(mut self, records: Vec<Value>) -> Self {
        self.content = Some(records);
        self
    }

    pub fn fields(mut self, value_field: impl Into<String>, label_field: impl Into<String>) -> Self {
        self.value_field = value_field.into();
        self.label_field = label_field.into();
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn typeahead_quiet(mut self, quiet: Duration) -> Self {
        self.typeahead_quiet_ms = quiet.as_millis() as u64;
        self
    }

    pub fn field_selectors(&self) -> FieldSelectors {
        FieldSelectors::new(self.value_field.clone(), self.label_field.clone())
    }

    pub fn selection_mode(&self) -> SelectionMode {
        SelectionMode::from_multiple(self.multiple)
    }

    pub fn typeahead_quiet_interval(&self) -> Duration {
        Duration::from_millis(self.typeahead_quiet_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = DropdownConfig::default();
        assert_eq!(config.content, None);
        assert_eq!(config.value_field, "value");
        assert_eq!(config.label_field, "label");
        assert_eq!(config.typeahead_quiet_ms, 500);
        assert_eq!(config.selection_mode(), SelectionMode::Single);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = DropdownConfig::from_toml_str("").unwrap();
        assert_eq!(config, DropdownConfig::default());
    }

    #[test]
    fn test_json() {
        let config = DropdownConfig::from_json_str(
            r#"{"multiple": true, "value_field": "code", "label_field": "meta.name", "content": []}"#,
        )
        .unwrap();
        assert!(config.multiple);
        assert_eq!(config.field_selectors(), FieldSelectors::new("code", "meta.name"));
        assert_eq!(config.content, Some(vec![]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            DropdownConfig::from_toml_str("multiple = \"yes\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            DropdownConfig::from_json_str("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("city.toml");
        std::fs::write(&toml_path, "searchable = true\ncontent = [\"Bern\"]\n").unwrap();
        let config = DropdownConfig::from_path(&toml_path).unwrap();
        assert!(config.searchable);
        assert_eq!(config.content, Some(vec![json!("Bern")]));

        let json_path = dir.path().join("tags.json");
        std::fs::write(&json_path, r#"{"multiple": true}"#).unwrap();
        assert!(DropdownConfig::from_path(&json_path).unwrap().multiple);
    }

    #[test]
    fn test_from_path_errors() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("city.yaml");
        std::fs::write(&yaml_path, "searchable: true").unwrap();
        let err = DropdownConfig::from_path(&yaml_path).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
        assert!(err.to_string().contains("city.yaml"));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            DropdownConfig::from_path(&missing),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = DropdownConfig::new()
            .content(vec![json!("a")])
            .multiple()
            .searchable()
            .placeholder("Choose")
            .typeahead_quiet(Duration::from_millis(250));
        assert!(config.multiple && config.searchable && !config.disabled);
        assert_eq!(config.placeholder, "Choose");
        assert_eq!(config.typeahead_quiet_interval(), Duration::from_millis(250));
    }
}
