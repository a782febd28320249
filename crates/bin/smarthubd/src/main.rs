//! # smarthubd — smarthub daemon
//!
//! Composition root that wires the virtual devices into the hub and runs it.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialise tracing
//! - Build devices, triggers and daily schedules from the configuration
//! - Log the initial status report
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod hub;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::hub::Hub;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    let retry = config.retry_policy()?;
    let hub = Hub::build(&config, retry)?;

    for line in hub.registry.status_report().to_string().lines() {
        tracing::info!("{line}");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    hub.shutdown();

    Ok(())
}
