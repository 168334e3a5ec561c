//! Restock purchasing bot - entry point.
//!
//! Watches every item in the shopping cart and places an order as soon as
//! it comes back in stock.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use restock_bot::{AppConfig, Application, CartConfig, DEFAULT_CART_PATH, DEFAULT_SETTINGS_PATH};

/// Restock purchasing bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Shopping cart file
    #[arg(short, long, default_value = DEFAULT_CART_PATH)]
    config: String,

    /// Settings file
    #[arg(short, long, env = "RESTOCK_SETTINGS", default_value = DEFAULT_SETTINGS_PATH)]
    settings: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Settings first: they carry the log level.
    let config = AppConfig::from_file(&args.settings)?;
    restock_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting restock bot v{}", env!("CARGO_PKG_VERSION"));
    info!(settings = %args.settings, cart = %args.config, "Configuration loaded");

    let cart = CartConfig::from_file(&args.config)?;
    let app = Application::new(config, &cart)?;
    info!(items = app.tasks().len(), "Shopping cart loaded");

    let report = app.run().await?;
    info!(purchased = report.purchased(), "Exiting");

    Ok(())
}
