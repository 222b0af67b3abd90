mod app;
mod config;
mod console;
mod db;
mod models;
mod processor;
mod serial;

use app::AppContext;
use config::AppConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const LINE_CHANNEL_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Alert Bridge...");

    // Init remote store; nothing useful can happen without it
    let store = db::init_store(&config).map_err(|e| {
        error!("Remote store initialization error: {}", e);
        e
    })?;
    info!("Remote store initialized ({})", store.backend());

    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    if console::spawn_console_reader(tx.clone()).is_none() {
        warn!("Console input unavailable");
    }
    let serial = serial::start(&config.serial, tx);
    if !serial.is_running() {
        info!("Running on console input only");
    }

    let mut ctx = AppContext::new(store, StdRng::from_entropy(), config.alert_debounce);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };
    app::run(&mut ctx, rx, shutdown).await;

    // Teardown: release the port, then flush what is still in flight
    if let Err(e) = tokio::task::spawn_blocking(move || serial.close()).await {
        error!("Failed to close serial port: {}", e);
    }
    ctx.shutdown(config.shutdown_grace).await;
    info!("Alert Bridge stopped");

    Ok(())
}
