use anyhow::Result;
use clap::Parser;

use siteship::commands::{self, Cli, Commands};
use siteship::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;
    telemetry::init_tracing(&config.logging);

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Deploy(args) => commands::deploy::execute(args, &config).await,
        Commands::Assets(args) => commands::assets::execute(args, &config).await,
        Commands::Status(args) => commands::status::execute(args, &config).await,
    }
}
