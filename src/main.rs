use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use pricedrop_watcher::web::{self, AppState};
use pricedrop_watcher::{AppConfig, PriceCheckScheduler};

#[derive(Parser)]
#[command(name = "pricedrop-watcher", version, about = "Tracks product prices and emails owners when they drop")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run one batch price check and print the summary as JSON
    CheckPrices,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricedrop_watcher=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let state = AppState::from_config(config)
        .await
        .context("Failed to initialise application")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(state).await,
        Command::CheckPrices => {
            let report = state.price_checker.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(state: AppState) -> Result<()> {
    info!("Starting pricedrop-watcher...");

    let mut scheduler = if state.config.scheduler.enabled {
        let mut scheduler =
            PriceCheckScheduler::new(Arc::clone(&state.price_checker), state.config.scheduler.clone()).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        None
    };

    let served = web::serve(state).await;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.shutdown().await?;
    }
    served
}
