use clap::Parser;
use tracing::debug;

use wordfreq::cli::Cli;
use wordfreq::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config();
    init_logging(config.debug);
    debug!(?config, "starting");

    wordfreq::run(&config)?;
    Ok(())
}
