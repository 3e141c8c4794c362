//! CLI definition for the gear runner.
//!
//! The platform starts the gear with no arguments; the flags exist to point
//! the runner at another gear directory or environment snapshot when running
//! locally.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::gear::{DEFAULT_GEAR_DIR, ENVIRON_FILE};
use crate::runner::{initialize, GearRunner};

/// Runs a BIDS App as a gear.
#[derive(Parser, Debug)]
#[command(name = "bids-app-gear")]
#[command(about = "Stage a BIDS dataset, run a BIDS App on it and package the results")]
#[command(version)]
pub struct Cli {
    /// Gear directory holding manifest.json, config.json, work/ and output/.
    #[arg(long, env = "GEAR_DIR", default_value = DEFAULT_GEAR_DIR)]
    pub gear_dir: PathBuf,

    /// JSON snapshot of the environment the BIDS App runs with.
    #[arg(long, default_value = ENVIRON_FILE)]
    pub environ_file: PathBuf,

    /// Log level used when neither RUST_LOG nor gear-log-level is set.
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the gear with the parsed arguments and return the process exit code.
///
/// Initialization failures are returned as errors; everything after that is
/// folded into the exit code.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<i32> {
    let (context, mut state) = initialize(&cli.gear_dir, &cli.environ_file, &cli.log_level)?;
    info!("Running gear from {}", context.gear_dir.display());

    Ok(GearRunner::default().run(&context, &mut state).await)
}
