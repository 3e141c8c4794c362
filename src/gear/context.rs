//! Execution context provided by the platform.
//!
//! The platform mounts the gear directory (`/flywheel/v0` by default) with a
//! `config.json` holding configuration values, resolved inputs and the run
//! destination. Working and output directories live beneath it.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::manifest::Manifest;
use crate::error::ContextError;

/// Default location of the gear directory inside the container.
pub const DEFAULT_GEAR_DIR: &str = "/flywheel/v0";

pub const DRY_RUN: &str = "gear-dry-run";
pub const SAVE_ALL_OUTPUT: &str = "gear-save-all-output";
pub const LOG_LEVEL: &str = "gear-log-level";
pub const RUN_BIDS_VALIDATION: &str = "gear-run-bids-validation";

/// Shape of `config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub config: IndexMap<String, Value>,
    #[serde(default)]
    pub inputs: IndexMap<String, InputFile>,
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// A resolved input as described in `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFile {
    pub base: String,
    #[serde(default)]
    pub location: Option<InputLocation>,
}

/// Where a file input was placed inside the container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLocation {
    pub path: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
}

/// The container the run writes results to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Execution context for one gear run.
#[derive(Debug, Clone)]
pub struct GearContext {
    pub gear_dir: PathBuf,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config: IndexMap<String, Value>,
    pub inputs: IndexMap<String, InputFile>,
    pub destination: Option<Destination>,
    pub manifest: Manifest,
}

impl GearContext {
    /// Loads `config.json` from the gear directory.
    pub fn load(gear_dir: impl Into<PathBuf>) -> Result<Self, ContextError> {
        let gear_dir = gear_dir.into();
        let path = gear_dir.join("config.json");
        let content = fs::read_to_string(&path).map_err(|source| ContextError::Read {
            path: path.clone(),
            source,
        })?;
        let file: ConfigFile =
            serde_json::from_str(&content).map_err(|source| ContextError::Parse { path, source })?;

        Ok(Self::from_config_file(gear_dir, file))
    }

    /// Builds a context from an already parsed `config.json`.
    pub fn from_config_file(gear_dir: impl Into<PathBuf>, file: ConfigFile) -> Self {
        let gear_dir = gear_dir.into();
        Self {
            work_dir: gear_dir.join("work"),
            output_dir: gear_dir.join("output"),
            gear_dir,
            config: file.config,
            inputs: file.inputs,
            destination: file.destination,
            manifest: Manifest::default(),
        }
    }

    /// Attaches the manifest and fills config values it declares defaults for.
    pub fn attach_manifest(&mut self, manifest: Manifest) {
        for (key, value) in manifest.defaults() {
            if !self.config.contains_key(key) {
                self.config.insert(key.clone(), value.clone());
            }
        }
        self.manifest = manifest;
    }

    /// Path of the manifest inside the gear directory.
    pub fn manifest_path(&self) -> PathBuf {
        self.gear_dir.join("manifest.json")
    }

    /// Returns a config flag, treating a missing or non-boolean value as false.
    pub fn flag(&self, key: &str) -> bool {
        self.config.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn dry_run(&self) -> bool {
        self.flag(DRY_RUN)
    }

    pub fn save_all_output(&self) -> bool {
        self.flag(SAVE_ALL_OUTPUT)
    }

    pub fn run_bids_validation(&self) -> bool {
        self.flag(RUN_BIDS_VALIDATION)
    }

    /// The configured log level, lowercased for use as a tracing filter.
    pub fn log_level(&self) -> Option<String> {
        self.config
            .get(LOG_LEVEL)
            .and_then(Value::as_str)
            .map(|level| level.to_lowercase())
    }

    /// Resolved path of a file input, if it was provided.
    pub fn input_path(&self, name: &str) -> Option<&Path> {
        self.inputs
            .get(name)
            .and_then(|input| input.location.as_ref())
            .map(|location| location.path.as_path())
    }

    /// Destination id, or `unknown` when the platform did not provide one.
    pub fn destination_id(&self) -> &str {
        self.destination
            .as_ref()
            .map(|d| d.id.as_str())
            .unwrap_or("unknown")
    }

    /// Logs the effective configuration, one entry per key.
    pub fn log_config(&self) {
        let mut keys: Vec<&String> = self.config.keys().collect();
        keys.sort();
        info!("Gear configuration:");
        for key in keys {
            info!("  {}: {}", key, self.config[key]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::manifest::{ConfigSpec, ConfigType};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_context() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("config.json"),
            r#"{
                "config": {"gear-dry-run": true, "n_cpus": 2},
                "inputs": {
                    "fs_license_file": {
                        "base": "file",
                        "location": {"path": "/flywheel/v0/input/fs_license_file/license.txt", "name": "license.txt"}
                    }
                },
                "destination": {"id": "5f1e", "type": "analysis"}
            }"#,
        )
        .unwrap();

        let context = GearContext::load(temp.path()).unwrap();
        assert_eq!(context.work_dir, temp.path().join("work"));
        assert_eq!(context.output_dir, temp.path().join("output"));
        assert!(context.dry_run());
        assert!(!context.save_all_output());
        assert_eq!(context.destination_id(), "5f1e");
        assert_eq!(
            context.input_path("fs_license_file"),
            Some(Path::new("/flywheel/v0/input/fs_license_file/license.txt"))
        );
    }

    #[test]
    fn test_load_context_missing_config() {
        let temp = TempDir::new().unwrap();
        let err = GearContext::load(temp.path()).unwrap_err();
        assert!(matches!(err, ContextError::Read { .. }));
    }

    #[test]
    fn test_attach_manifest_fills_defaults() {
        let mut file = ConfigFile::default();
        file.config.insert("gear-log-level".into(), json!("DEBUG"));
        let mut context = GearContext::from_config_file("/gear", file);

        let mut manifest = Manifest {
            name: "bids-fmriprep".into(),
            ..Default::default()
        };
        for (key, default) in [
            ("gear-log-level", json!("INFO")),
            ("gear-save-all-output", json!(true)),
        ] {
            manifest.config.insert(
                key.into(),
                ConfigSpec {
                    value_type: if default.is_boolean() {
                        ConfigType::Boolean
                    } else {
                        ConfigType::String
                    },
                    default: Some(default),
                    description: None,
                    optional: false,
                    allowed: None,
                    minimum: None,
                    maximum: None,
                },
            );
        }

        context.attach_manifest(manifest);
        assert_eq!(context.log_level().as_deref(), Some("debug"));
        assert!(context.save_all_output());
        assert_eq!(context.destination_id(), "unknown");
    }
}
