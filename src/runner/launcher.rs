//! Launching the BIDS App as a child process.

use std::process::Stdio;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecutionError;

/// Exit code and captured stderr of one command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code; `-1` when the child was terminated by a signal.
    pub exit_code: i32,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn new(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with code 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for running the assembled command.
#[async_trait]
pub trait CommandLauncher: Send + Sync {
    /// Runs `command` to completion with exactly `environ` as its environment.
    async fn launch(
        &self,
        command: &[String],
        environ: &IndexMap<String, String>,
    ) -> Result<CommandOutcome, ExecutionError>;
}

/// Launches commands as real child processes.
///
/// Stdout is inherited; stderr is captured in full and returned.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

#[async_trait]
impl CommandLauncher for ProcessLauncher {
    async fn launch(
        &self,
        command: &[String],
        environ: &IndexMap<String, String>,
    ) -> Result<CommandOutcome, ExecutionError> {
        let (program, args) = command.split_first().ok_or(ExecutionError::EmptyCommand)?;

        let spawn_error = |source| ExecutionError::Spawn {
            program: program.clone(),
            source,
        };

        // `output()` would pipe stdout too; spawn so it stays inherited.
        let child = Command::new(program)
            .args(args)
            .env_clear()
            .envs(environ)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let output = child.wait_with_output().await.map_err(spawn_error)?;

        let exit_code = output.status.code().unwrap_or(-1);
        debug!("{} exited with {}", program, exit_code);

        Ok(CommandOutcome::new(
            exit_code,
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environ() -> IndexMap<String, String> {
        let mut environ = IndexMap::new();
        environ.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        environ
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_outcome_success() {
        assert!(CommandOutcome::new(0, "").is_success());
        assert!(!CommandOutcome::new(2, "boom").is_success());
    }

    #[tokio::test]
    async fn test_launch_captures_stderr_and_code() {
        let outcome = ProcessLauncher
            .launch(&sh("echo oops >&2; exit 3"), &environ())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_launch_uses_only_given_environment() {
        let mut environ = environ();
        environ.insert("GEAR_MARKER".to_string(), "set".to_string());

        let outcome = ProcessLauncher
            .launch(
                &sh("test \"$GEAR_MARKER\" = set && test -z \"$HOME\""),
                &environ,
            )
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_launch_inherits_stdout() {
        let parent_stdout = std::fs::read_link("/proc/self/fd/1").unwrap();

        let outcome = ProcessLauncher
            .launch(&sh("readlink /proc/$$/fd/1 >&2"), &environ())
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.stderr.trim_end(), parent_stdout.to_string_lossy());
    }

    #[tokio::test]
    async fn test_launch_missing_program() {
        let err = ProcessLauncher
            .launch(&["/nonexistent/fmriprep".to_string()], &environ())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_launch_empty_command() {
        let err = ProcessLauncher.launch(&[], &environ()).await.unwrap_err();
        assert!(matches!(err, ExecutionError::EmptyCommand));
    }
}
