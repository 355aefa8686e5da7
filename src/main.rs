use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use shockplay::actuation::OpenShockDispatcher;
use shockplay::{config, logging, player, Cli};

fn main() -> Result<ExitCode> {
    // Parse CLI arguments; a missing audio path exits here with usage
    let cli = Cli::parse();

    // Initialize logging (early)
    logging::init_logging(cli.log_level());
    tracing::debug!("shockplay {} starting", env!("CARGO_PKG_VERSION"));

    // Load env file and environment, then merge CLI options on top
    let options = config::load_config(&cli.env_file)?;
    let options = cli.merge_into_options(options)?;
    options.log_summary();

    let dispatcher = OpenShockDispatcher::from_options(&options);
    let outcome = player::play(&cli.audio_file, &options, dispatcher);

    tracing::debug!("Session outcome: {:?}", outcome);
    Ok(ExitCode::from(outcome.exit_code() as u8))
}
