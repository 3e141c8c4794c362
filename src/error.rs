//! Error types for the gear runner.
//!
//! Defines one error type per subsystem:
//! - Context loading (manifest, config.json, environment snapshot)
//! - Argument resolution and validation
//! - BIDS staging and layout validation
//! - Command execution
//! - Output archiving
//!
//! Context errors are fatal and abort the run. Everything else is wrapped in
//! a [`StageError`] and recorded in the run's error log.

use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading the execution context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while resolving and validating command-line arguments.
#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("Parameter '{0}' is not declared in the manifest")]
    UnknownParameter(String),

    #[error("Input file '{name}' not found at {}", path.display())]
    MissingInput { name: String, path: PathBuf },

    #[error("Input '{0}' has no file location")]
    NoLocation(String),

    #[error("Invalid parameters: {0}")]
    Validation(String),
}

/// Errors raised while staging or validating the BIDS dataset.
#[derive(Debug, Error)]
pub enum BidsError {
    #[error("No BIDS source: no 'bids' archive input and no dataset at {}", .0.display())]
    NoSource(PathBuf),

    #[error("Unsupported BIDS archive format: {}", .0.display())]
    UnsupportedArchive(PathBuf),

    #[error("Invalid BIDS layout: {0}")]
    InvalidLayout(String),

    #[error("bids-validator reported {errors} error(s)")]
    Validator { errors: usize },

    #[error("Failed to run bids-validator: {0}")]
    ValidatorUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while executing the BIDS App command.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No command to execute")]
    EmptyCommand,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while archiving the output directory.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Output directory not found: {}", .0.display())]
    MissingOutputDir(PathBuf),

    #[error("Failed to walk output directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A recoverable error recorded by one pipeline stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Args(#[from] ArgsError),

    #[error(transparent)]
    Bids(#[from] BidsError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl StageError {
    /// Returns the error's kind as `Type::Variant`, used in the final summary.
    pub fn kind(&self) -> &'static str {
        match self {
            StageError::Args(e) => match e {
                ArgsError::UnknownParameter(_) => "ArgsError::UnknownParameter",
                ArgsError::MissingInput { .. } => "ArgsError::MissingInput",
                ArgsError::NoLocation(_) => "ArgsError::NoLocation",
                ArgsError::Validation(_) => "ArgsError::Validation",
            },
            StageError::Bids(e) => match e {
                BidsError::NoSource(_) => "BidsError::NoSource",
                BidsError::UnsupportedArchive(_) => "BidsError::UnsupportedArchive",
                BidsError::InvalidLayout(_) => "BidsError::InvalidLayout",
                BidsError::Validator { .. } => "BidsError::Validator",
                BidsError::ValidatorUnavailable(_) => "BidsError::ValidatorUnavailable",
                BidsError::Io(_) => "BidsError::Io",
                BidsError::Json(_) => "BidsError::Json",
            },
            StageError::Execution(e) => match e {
                ExecutionError::EmptyCommand => "ExecutionError::EmptyCommand",
                ExecutionError::Spawn { .. } => "ExecutionError::Spawn",
            },
            StageError::Archive(e) => match e {
                ArchiveError::MissingOutputDir(_) => "ArchiveError::MissingOutputDir",
                ArchiveError::Walk(_) => "ArchiveError::Walk",
                ArchiveError::Io(_) => "ArchiveError::Io",
            },
        }
    }

    /// Renders the error and every source below it, outermost first.
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = StdError::source(self);
        while let Some(cause) = source {
            out.push_str(&format!("\n  caused by: {}", cause));
            source = StdError::source(cause);
        }
        out
    }
}
