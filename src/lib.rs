//! bids-app-gear: runs a BIDS App as a platform gear.
//!
//! This library loads the gear context, builds and validates the BIDS App
//! command line, stages the BIDS dataset, runs the command and packages
//! the output.

pub mod args;
pub mod bids;
pub mod cli;
pub mod error;
pub mod export;
pub mod gear;
pub mod runner;

// Re-export commonly used error types
pub use error::{ArchiveError, ArgsError, BidsError, ContextError, ExecutionError, StageError};
