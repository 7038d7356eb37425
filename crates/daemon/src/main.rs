mod config;

use anyhow::Context;
use common::setup_logging;
use config::DaemonConfig;
use discovery::Broker;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let config = DaemonConfig::from_env()?;
    setup_logging(config.environment);

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    let mut broker = Broker::bind(&config.socket_path)
        .with_context(|| format!("failed to bind broker socket at {}", config.socket_path))?;

    tracing::info!(socket = %config.socket_path, "discovery daemon listening");

    broker.run(&shutdown).context("broker loop failed")?;
    Ok(())
}
