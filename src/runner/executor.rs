//! Gear runner - the stage sequence of one run.

use std::path::Path;

use anyhow::Context;
use tracing::{debug, error, info};

use super::launcher::{CommandLauncher, CommandOutcome, ProcessLauncher};
use crate::args;
use crate::bids;
use crate::error::{ArgsError, BidsError, ExecutionError, StageError};
use crate::export::{OutputArchiver, TarGzArchiver};
use crate::gear::state::{environ_line, load_environ};
use crate::gear::{load_manifest_json, logging, GearContext, GearState};

/// The BIDS App this gear wraps.
pub const EXECUTABLE: &str = "fmriprep";

/// Analysis level passed as the third positional argument.
pub const ANALYSIS_LEVEL: &str = "participant";

/// Stderr of the synthetic result used when `gear-dry-run` is set.
pub const DRY_RUN_MESSAGE: &str = "gear-dry-run is set:  Did NOT run gear code.";

/// Loads the context, installs the logger and creates the run state.
///
/// Errors here are fatal: the run stops before any command is built.
pub fn initialize(
    gear_dir: &Path,
    environ_file: &Path,
    default_log_level: &str,
) -> anyhow::Result<(GearContext, GearState)> {
    let mut context = GearContext::load(gear_dir).context("Failed to load gear context")?;
    let manifest = load_manifest_json(&context.manifest_path())
        .context("Failed to load gear manifest")?;
    context.attach_manifest(manifest);

    if let Err(e) = logging::init(&context, default_log_level) {
        debug!("Logger already installed: {}", e);
    }

    context.log_config();

    let environ = load_environ(environ_file).context("Failed to load gear environment")?;
    let state = GearState::new(&context, environ);
    debug!("{}", environ_line(&state.environ));

    Ok((context, state))
}

/// Runs the command, data and execution stages against an initialized run.
pub struct GearRunner {
    launcher: Box<dyn CommandLauncher>,
    archiver: Box<dyn OutputArchiver>,
}

impl Default for GearRunner {
    fn default() -> Self {
        Self::new(Box::new(ProcessLauncher), Box::new(TarGzArchiver))
    }
}

impl GearRunner {
    pub fn new(launcher: Box<dyn CommandLauncher>, archiver: Box<dyn OutputArchiver>) -> Self {
        Self { launcher, archiver }
    }

    /// Runs every stage in order and returns the process exit code.
    ///
    /// A failing stage never stops later stages; any recorded error makes
    /// the exit code 1.
    pub async fn run(&self, context: &GearContext, state: &mut GearState) -> i32 {
        create_command(context, state);
        set_up_data(context, state).await;
        self.execute(context, state).await
    }

    /// Runs the command (or fakes a failed run under `gear-dry-run`), then
    /// finalizes: archives output if asked and computes the exit code.
    pub async fn execute(&self, context: &GearContext, state: &mut GearState) -> i32 {
        let outcome = self.run_command(context, state).await;
        self.finalize(context, state, outcome)
    }

    async fn run_command(
        &self,
        context: &GearContext,
        state: &mut GearState,
    ) -> Option<CommandOutcome> {
        info!("Command: {}", state.command.join(" "));

        let result = if context.dry_run() {
            Ok(CommandOutcome::new(1, DRY_RUN_MESSAGE))
        } else if state.command.is_empty() {
            Err(ExecutionError::EmptyCommand)
        } else {
            self.launcher.launch(&state.command, &state.environ).await
        };

        match result {
            Ok(outcome) => {
                info!("Return code: {}", outcome.exit_code);
                if outcome.is_success() {
                    info!("Command successfully executed!");
                } else {
                    error!("{}", outcome.stderr);
                    info!("Command failed.");
                }
                Some(outcome)
            }
            Err(e) => {
                record_failure(state, e, "Unable to execute command.");
                None
            }
        }
    }

    fn finalize(
        &self,
        context: &GearContext,
        state: &mut GearState,
        outcome: Option<CommandOutcome>,
    ) -> i32 {
        if context.save_all_output() {
            if let Err(e) = self.archiver.archive(context) {
                record_failure(state, e, "Unable to save output.");
            }
        }

        let mut ret = outcome.map(|o| o.exit_code).unwrap_or(1);

        if state.has_errors() {
            info!("{}", state.error_summary());
            ret = 1;
        }

        info!("BIDS App Gear is done.");
        ret
    }
}

/// Builds and validates the command line.
///
/// On failure the error is recorded and the command is left empty, so
/// nothing unvalidated can be executed.
pub fn create_command(context: &GearContext, state: &mut GearState) {
    if let Err(e) = build_validated_command(context, state) {
        state.command.clear();
        record_failure(state, e, "Error in creating and validating command.");
    }
}

fn build_validated_command(context: &GearContext, state: &mut GearState) -> Result<(), ArgsError> {
    state.command = vec![EXECUTABLE.to_string()];

    // Positionals follow the BIDS Apps convention and precede every flag.
    state.command.push(state.bids_path.to_string_lossy().to_string());
    state.command.push(context.output_dir.to_string_lossy().to_string());
    state.command.push(ANALYSIS_LEVEL.to_string());

    args::get_inputs_and_args(context, state)?;
    args::validate(context, state)?;
    state.command = args::build_command(state);

    Ok(())
}

/// Stages the BIDS dataset and validates its layout.
pub async fn set_up_data(context: &GearContext, state: &mut GearState) {
    if let Err(e) = stage_bids(context, state).await {
        record_failure(state, e, "Error in BIDS download and validation.");
    }
}

async fn stage_bids(context: &GearContext, state: &GearState) -> Result<(), BidsError> {
    bids::download_bids(context, state)?;
    bids::validate_bids(context, state).await
}

fn record_failure(state: &mut GearState, error: impl Into<StageError>, message: &str) {
    let error = error.into();
    error!(severity = "critical", "{}", error);
    error!("{}\n{}", message, error.chain());
    state.record(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gear::context::ConfigFile;
    use crate::gear::Manifest;
    use serde_json::json;

    fn context(config: serde_json::Value, manifest: serde_json::Value) -> GearContext {
        let file: ConfigFile = serde_json::from_value(json!({ "config": config })).unwrap();
        let mut context = GearContext::from_config_file("/flywheel/v0", file);
        let manifest: Manifest = serde_json::from_value(manifest).unwrap();
        context.attach_manifest(manifest);
        context
    }

    #[test]
    fn test_create_command_positionals_then_flags() {
        let context = context(
            json!({"n_cpus": 2, "gear-dry-run": true}),
            json!({"name": "bids-fmriprep", "config": {
                "n_cpus": {"type": "integer"},
                "gear-dry-run": {"type": "boolean"}
            }}),
        );
        let mut state = GearState::new(&context, Default::default());

        create_command(&context, &mut state);

        assert!(!state.has_errors());
        assert_eq!(
            state.command,
            vec![
                "fmriprep",
                "/flywheel/v0/work/bids",
                "/flywheel/v0/output",
                "participant",
                "--n_cpus=2"
            ]
        );
    }

    #[test]
    fn test_create_command_failure_is_recorded() {
        let context = context(json!({"n_cpus": "two"}), json!({"name": "g", "config": {
            "n_cpus": {"type": "integer"}
        }}));
        let mut state = GearState::new(&context, Default::default());

        create_command(&context, &mut state);

        assert!(state.command.is_empty());
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].kind(), "ArgsError::Validation");
    }

    #[tokio::test]
    async fn test_set_up_data_failure_is_recorded() {
        let context = context(json!({}), json!({"name": "g"}));
        let mut state = GearState::new(&context, Default::default());
        state.bids_path = std::env::temp_dir().join("bids-app-gear-absent-dataset");

        set_up_data(&context, &mut state).await;

        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].kind(), "BidsError::NoSource");
    }
}
