//! # Planet Build - Main Entry Point
//!
//! 1. Parse the command line
//! 2. Resolve the config (CLI over `build-config.json` over defaults)
//! 3. Set up logging (DEBUG when verbose, optional log file)
//! 4. Run the build and report totals
//!
//! Per-file failures never change the exit status; only an unusable
//! configuration does.
//!
//! ```bash
//! planet-build --config=./bin/build-config.json --optimizeImages=false --dryrun
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use planet_build::{cli::Cli, logging, BuildConfig, BuildOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = BuildConfig::load(&cli.config, cli.to_layer()).await;

    let _guard = logging::init(config.verbose, config.logfile.as_deref())?;

    if let Some(e) = config_error {
        error!("{}; continuing with command line and default settings", e);
    }

    let orchestrator = BuildOrchestrator::new(config)?;
    let stats = orchestrator.run().await;
    info!("{}", stats.format_summary());

    Ok(())
}
