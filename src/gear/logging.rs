//! Logger setup for a gear run.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::context::GearContext;

/// Resolves the log filter for a run.
///
/// Priority: RUST_LOG env var > `gear-log-level` config > CLI default.
pub fn log_filter(context: &GearContext, default_level: &str) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .or_else(|| context.log_level())
        .unwrap_or_else(|| default_level.to_string())
}

/// Installs the global tracing subscriber.
pub fn init(context: &GearContext, default_level: &str) -> Result<(), TryInitError> {
    let filter = log_filter(context, default_level);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
}
