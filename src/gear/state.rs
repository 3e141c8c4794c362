//! Run-scoped scratch state threaded through every stage.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use super::context::GearContext;
use crate::error::{ContextError, StageError};

/// Default location of the environment snapshot written by the container entrypoint.
pub const ENVIRON_FILE: &str = "/tmp/gear_environ.json";

/// Mutable state for one run, created at initialization and dropped at exit.
#[derive(Debug, Default)]
pub struct GearState {
    /// Where the BIDS dataset is staged.
    pub bids_path: PathBuf,
    /// Errors recorded by earlier stages. Append-only.
    pub errors: Vec<StageError>,
    /// Environment the command runs with.
    pub environ: IndexMap<String, String>,
    /// The command line, built incrementally then replaced by the final version.
    pub command: Vec<String>,
    /// Parameters resolved from config and inputs, rendered into flags.
    pub params: IndexMap<String, Value>,
}

impl GearState {
    /// Creates the state for a context; the BIDS path is `<work_dir>/bids`.
    pub fn new(context: &GearContext, environ: IndexMap<String, String>) -> Self {
        Self {
            bids_path: context.work_dir.join("bids"),
            environ,
            ..Default::default()
        }
    }

    /// Appends an error to the run's error log.
    pub fn record(&mut self, error: impl Into<StageError>) {
        self.errors.push(error.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consolidated summary of every recorded error, one per line.
    pub fn error_summary(&self) -> String {
        let mut msg = String::from("Previous errors:\n");
        for err in &self.errors {
            msg.push_str(&format!("  {}: {}\n", err.kind(), err));
        }
        msg
    }
}

/// Reads the environment snapshot: a flat JSON object of strings.
pub fn load_environ(path: &Path) -> Result<IndexMap<String, String>, ContextError> {
    let content = fs::read_to_string(path).map_err(|source| ContextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ContextError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders the environment as `k=v ` pairs. Values are not masked.
pub fn environ_line(environ: &IndexMap<String, String>) -> String {
    let mut kv = String::new();
    for (key, value) in environ {
        kv.push_str(key);
        kv.push('=');
        kv.push_str(value);
        kv.push(' ');
    }
    format!("Environment: {}", kv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgsError, BidsError};
    use crate::gear::context::ConfigFile;
    use tempfile::TempDir;

    #[test]
    fn test_new_state_bids_path() {
        let context = GearContext::from_config_file("/flywheel/v0", ConfigFile::default());
        let state = GearState::new(&context, IndexMap::new());
        assert_eq!(state.bids_path, PathBuf::from("/flywheel/v0/work/bids"));
        assert!(!state.has_errors());
        assert!(state.command.is_empty());
    }

    #[test]
    fn test_load_environ_keeps_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gear_environ.json");
        fs::write(&path, r#"{"PATH": "/usr/bin", "HOME": "/root", "FS_LICENSE": "x"}"#).unwrap();

        let environ = load_environ(&path).unwrap();
        let keys: Vec<_> = environ.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["PATH", "HOME", "FS_LICENSE"]);
        assert_eq!(
            environ_line(&environ),
            "Environment: PATH=/usr/bin HOME=/root FS_LICENSE=x "
        );
    }

    #[test]
    fn test_load_environ_rejects_bad_input() {
        let temp = TempDir::new().unwrap();

        let missing = load_environ(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(missing, ContextError::Read { .. }));

        let path = temp.path().join("gear_environ.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_environ(&path).unwrap_err(), ContextError::Parse { .. }));

        fs::write(&path, r#"{"OMP_NUM_THREADS": 4}"#).unwrap();
        assert!(matches!(load_environ(&path).unwrap_err(), ContextError::Parse { .. }));
    }

    #[test]
    fn test_error_summary_lists_every_error() {
        let mut state = GearState::default();
        state.record(ArgsError::Validation("n_cpus must be >= 1".into()));
        state.record(BidsError::InvalidLayout("no subjects".into()));

        assert!(state.has_errors());
        assert_eq!(
            state.error_summary(),
            "Previous errors:\n  ArgsError::Validation: Invalid parameters: n_cpus must be >= 1\n  BidsError::InvalidLayout: Invalid BIDS layout: no subjects\n"
        );
    }
}
