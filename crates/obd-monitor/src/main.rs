//! OBD-II Monitor - Main Entry Point

use anyhow::Context;
use obd_monitor::{init_logging, run, MonitorConfig};
use std::path::PathBuf;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = MonitorConfig::load(path.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("=== OBD-II Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let run_for = config.run_for();
    let shutdown = async move {
        match run_for {
            Some(duration) => tokio::time::sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl-C handler unavailable: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        }
        info!("Shutdown requested");
    };

    let snapshot = run(config, shutdown).await.context("Monitor failed")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
