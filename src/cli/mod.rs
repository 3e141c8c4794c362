//! Command-line interface for the gear runner.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
