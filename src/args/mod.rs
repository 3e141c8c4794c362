//! Translation of gear config and inputs into BIDS App command-line flags.
//!
//! Three steps, run in order by the command stage:
//! 1. [`get_inputs_and_args`] resolves config values and file inputs into
//!    `GearState::params`
//! 2. [`validate`] checks the parameters against the manifest before anything runs
//! 3. [`build_command`] renders the parameters as flags after the positionals

mod build;
mod resolve;
mod validate;

pub use build::{build_command, render_value};
pub use resolve::{flag_name, get_inputs_and_args};
pub use validate::validate;
