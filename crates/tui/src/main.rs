mod app;
mod block_font;

use anyhow::Result;
use std::fs::{self, OpenOptions};

use multiaventura_core::{
    config::{self, AppConfig},
    JsonFileStore,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    let store = JsonFileStore::open(config.store_path());
    tracing::info!(store = %store.path().display(), "Configuration loaded");
    let mut app = app::MultiAventuraApp::new(config, store);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("multiaventura.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // the terminal is in raw mode while playing, so logs only go to the file
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
