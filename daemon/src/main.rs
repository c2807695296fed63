use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use usdtg_daemon::{
    config::NodeConfig,
    core::{storage::SledStorage, Runtime},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::parse();

    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .init();

    info!(
        "USDTgVerse core runtime v{}, {} cpu core(s)",
        usdtg_common::config::VERSION,
        num_cpus::get()
    );

    let storage = SledStorage::open(&config.data_dir)
        .with_context(|| format!("opening storage at {}", config.data_dir))?;
    let runtime = Runtime::with_defaults(storage);

    info!("runtime ready, data dir: {}", config.data_dir);

    // The engines are driven by external adapters; the process itself
    // only has to stay alive and shut down cleanly.
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    info!("shutdown signal received");
    runtime.stop().await.context("stopping runtime")?;

    Ok(())
}
