use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freshet::app::AppContext;
use freshet::cli::{commands, Cli, Commands};
use freshet::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Add { url, category } => {
            commands::add_feed(&ctx, &url, category.as_deref()).await?;
        }
        Commands::Remove { url } => {
            commands::remove_feed(&ctx, &url)?;
        }
        Commands::SetCategory { url, category } => {
            commands::set_category(&ctx, &url, category.as_deref())?;
        }
        Commands::List => {
            commands::list_feeds(&ctx)?;
        }
        Commands::Items {
            feed,
            category,
            limit,
        } => {
            commands::list_items(&ctx, feed, category, limit)?;
        }
        Commands::Refresh { url } => {
            commands::refresh_feed(&ctx, &url).await?;
        }
        Commands::Sync => {
            commands::sync_once(&ctx).await?;
        }
        Commands::Serve => {
            commands::serve(&ctx).await?;
        }
    }

    Ok(())
}
