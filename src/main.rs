use anyhow::Result;
use std::io;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use superdump::cli::Cli;
use superdump::dump_superblocks;

fn main() -> Result<()> {
    let cli = Cli::parse_ordered();
    init_tracing(cli.log_level());

    let options = cli.dump_options()?;
    let report = dump_superblocks(cli.devices.as_slice(), options, io::stdout().lock())?;
    debug!(?report, "done");

    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
