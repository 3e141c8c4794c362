//! bids-app-gear entry point.
//!
//! Parses the CLI, runs the gear and exits with the code it computed.
//! Logging is installed during initialization, once the gear config is known.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = bids_app_gear::cli::parse_cli();

    let code = bids_app_gear::cli::run_with_cli(cli).await?;

    std::process::exit(code)
}
