mod cli;
mod shutdown;
mod startup;

use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    startup::init_logging()?;

    info!("Starting organiser");

    // Load configuration
    let config = startup::load_config().await?;

    startup::run(config, args.command).await
}
