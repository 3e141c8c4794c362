//! Gear runner for BIDS Apps.
//!
//! # Architecture
//!
//! ```text
//! initialize → create_command → set_up_data → execute → exit code
//! ```
//!
//! The runner:
//! 1. Loads config.json, the manifest and the environment snapshot
//! 2. Builds and validates the BIDS App command line
//! 3. Stages the BIDS dataset into the working directory
//! 4. Runs the command and archives the output when asked
//!
//! Stage errors are recorded in [`GearState`](crate::gear::GearState) and
//! reported together at the end; only initialization errors abort the run.
//!
//! # Example
//!
//! ```ignore
//! use bids_app_gear::runner::{initialize, GearRunner};
//!
//! let (context, mut state) = initialize(gear_dir, environ_file, "info")?;
//! let code = GearRunner::default().run(&context, &mut state).await;
//! std::process::exit(code);
//! ```

pub mod executor;
pub mod launcher;

pub use executor::{
    create_command, initialize, set_up_data, GearRunner, ANALYSIS_LEVEL, DRY_RUN_MESSAGE,
    EXECUTABLE,
};
pub use launcher::{CommandLauncher, CommandOutcome, ProcessLauncher};
