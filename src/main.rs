use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use truthfeed::app::AppContext;
use truthfeed::cli::{commands, Cli, Commands};
use truthfeed::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for the feed itself
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { no_snapshot } => {
            let ctx = load_context(cli.config, cli.api_url)?;
            commands::watch(&ctx, no_snapshot).await?;
        }
        Commands::Snapshot { json } => {
            let ctx = load_context(cli.config, cli.api_url)?;
            commands::snapshot(&ctx, json).await?;
        }
        Commands::Render { body, text } => {
            commands::render(body, text)?;
        }
    }

    Ok(())
}

fn load_context(path: Option<PathBuf>, api_url: Option<String>) -> anyhow::Result<AppContext> {
    let mut config = match path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    if let Some(url) = api_url {
        config.api.base_url = Some(url);
    }

    Ok(AppContext::new(config)?)
}
