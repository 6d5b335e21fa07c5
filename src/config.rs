//! Engine configuration and TOML scope files
//!
//! A scope file supplies bindings for templates rendered from the command
//! line:
//!
//! ```toml
//! [metadata]
//! name = "release"
//!
//! [values]
//! version = "1.4.0"
//! targets = ["linux", "macos"]
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::expr::is_identifier;
use crate::scope::Scope;
use crate::value::Value;

/// Behaviour switches for an [`Interpolator`](crate::Interpolator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Keep parsed templates in the template cache
    pub cache_templates: bool,
    /// Reject placeholders shaped like a comprehension that fail to parse as one
    pub strict_comprehensions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_templates: true,
            strict_comprehensions: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_templates(mut self, enabled: bool) -> Self {
        self.cache_templates = enabled;
        self
    }

    pub fn with_strict_comprehensions(mut self, enabled: bool) -> Self {
        self.strict_comprehensions = enabled;
        self
    }
}

/// Errors that can occur when loading scope files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read scope file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse scope TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("'{0}' is not a valid binding name")]
    InvalidName(String),
}

/// Bindings loaded from a TOML file
#[derive(Debug, Clone)]
pub struct ScopeFile {
    /// Optional name for the scope file
    pub name: Option<String>,
    /// Optional description
    pub description: Option<String>,
    pub values: Scope,
}

/// TOML structure for deserializing scope files
#[derive(Deserialize)]
struct TomlScopeFile {
    metadata: Option<TomlMetadata>,
    #[serde(default)]
    values: toml::Table,
}

#[derive(Deserialize)]
struct TomlMetadata {
    name: Option<String>,
    description: Option<String>,
}

impl ScopeFile {
    /// Load a scope file from disk
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load a scope file from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlScopeFile = toml::from_str(content)?;

        let mut values = Scope::new();
        for (name, value) in parsed.values {
            if !is_identifier(&name) {
                return Err(ConfigError::InvalidName(name));
            }
            values.bind(name, toml_to_value(value));
        }

        Ok(ScopeFile {
            name: parsed.metadata.as_ref().and_then(|m| m.name.clone()),
            description: parsed.metadata.as_ref().and_then(|m| m.description.clone()),
            values,
        })
    }
}

/// Convert a TOML value into a template value
fn toml_to_value(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::from(s),
        toml::Value::Integer(n) => Value::Int(n),
        toml::Value::Float(x) => Value::Float(x),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::from(dt.to_string()),
        toml::Value::Array(items) => Value::list(items.into_iter().map(toml_to_value)),
        toml::Value::Table(table) => {
            Value::dict(table.into_iter().map(|(k, v)| (Value::from(k), toml_to_value(v))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope_file() {
        let toml = r#"
[metadata]
name = "release"
description = "Release notes bindings"

[values]
version = "1.4.0"
build = 42
ratio = 0.5
stable = true
targets = ["linux", "macos"]
released = 2024-05-01

[values.owner]
name = "ada"
"#;

        let file = ScopeFile::from_str(toml).unwrap();
        assert_eq!(file.name, Some("release".to_string()));
        assert_eq!(file.description, Some("Release notes bindings".to_string()));
        assert_eq!(file.values.get("version"), Some(&Value::from("1.4.0")));
        assert_eq!(file.values.get("build"), Some(&Value::Int(42)));
        assert_eq!(file.values.get("stable"), Some(&Value::Bool(true)));
        assert_eq!(
            file.values.get("targets").map(Value::repr),
            Some("['linux', 'macos']".to_string())
        );
        assert_eq!(file.values.get("released"), Some(&Value::from("2024-05-01")));
        assert_eq!(
            file.values.get("owner").map(Value::repr),
            Some("{'name': 'ada'}".to_string())
        );
    }

    #[test]
    fn test_values_table_is_optional() {
        let file = ScopeFile::from_str("[metadata]\nname = \"empty\"\n").unwrap();
        assert!(file.values.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let result = ScopeFile::from_str("[values\nx = 1");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_binding_name() {
        let result = ScopeFile::from_str("[values]\n\"not-valid\" = 1\n");
        assert!(matches!(result, Err(ConfigError::InvalidName(name)) if name == "not-valid"));
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::new()
            .with_cache_templates(false)
            .with_strict_comprehensions(true);
        assert!(!config.cache_templates);
        assert!(config.strict_comprehensions);
        assert!(EngineConfig::default().cache_templates);
    }
}
