//! Gear execution context, manifest, logging and run state.

pub mod context;
pub mod logging;
pub mod manifest;
pub mod state;

pub use context::{GearContext, DEFAULT_GEAR_DIR};
pub use manifest::{load_manifest_json, Manifest};
pub use state::{GearState, ENVIRON_FILE};
