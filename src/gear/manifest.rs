//! Gear manifest (`manifest.json`) model and loader.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContextError;

/// The gear manifest: identity plus declared config options and inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Gear name, used to name the output archive.
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Declared configuration options, in manifest order.
    #[serde(default)]
    pub config: IndexMap<String, ConfigSpec>,
    /// Declared inputs, in manifest order.
    #[serde(default)]
    pub inputs: IndexMap<String, InputSpec>,
}

/// Declaration of one configuration option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSpec {
    #[serde(rename = "type")]
    pub value_type: ConfigType,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, rename = "enum")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// JSON type of a configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    Boolean,
    Integer,
    Number,
    String,
    Array,
}

impl ConfigType {
    /// Returns true if `value` has this JSON type.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ConfigType::Boolean => value.is_boolean(),
            ConfigType::Integer => value.is_i64() || value.is_u64(),
            ConfigType::Number => value.is_number(),
            ConfigType::String => value.is_string(),
            ConfigType::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConfigType::Boolean => "boolean",
            ConfigType::Integer => "integer",
            ConfigType::Number => "number",
            ConfigType::String => "string",
            ConfigType::Array => "array",
        };
        write!(f, "{}", name)
    }
}

/// Declaration of one gear input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    pub base: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl Manifest {
    /// Returns config defaults declared in the manifest, in manifest order.
    pub fn defaults(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.config
            .iter()
            .filter_map(|(key, spec)| spec.default.as_ref().map(|value| (key, value)))
    }
}

/// Loads and parses a gear manifest.
pub fn load_manifest_json(path: &Path) -> Result<Manifest, ContextError> {
    let content = fs::read_to_string(path).map_err(|source| ContextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ContextError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
