use clap::Parser;
use excelmind::{execute, logging, Cli};
use excelmind_degradation::Settings;
use std::sync::Arc;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    execute::execute_command(cli.command, Arc::new(settings)).await
}
