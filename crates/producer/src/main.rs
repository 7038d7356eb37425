mod config;

use anyhow::Context;
use common::setup_logging;
use config::ProducerConfig;
use discovery::{Participant, Role};
use ring::{names, SharedRing};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let config = ProducerConfig::from_env()?;
    setup_logging(config.environment);

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    let ring_name = names::default_ring_name();
    let mut ring = SharedRing::create_and_init(&ring_name, config.slot_count, config.slot_size)
        .with_context(|| format!("failed to create ring {ring_name}"))?;
    tracing::info!(
        ring = %ring_name,
        slots = config.slot_count,
        slot_size = config.slot_size,
        "ring created"
    );

    let participant = Participant::register(
        &config.broker_socket,
        Role::Producer,
        &config.service,
        Some(&ring_name),
    )
    .context("failed to register with the discovery daemon")?;

    for i in 0..config.message_count {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }

        let message = format!("Message {i}");
        match ring.write_message(message.as_bytes()) {
            Ok(()) => tracing::info!(%message, "wrote"),
            Err(e) => tracing::error!("write failed: {e}"),
        }

        thread::sleep(Duration::from_millis(config.publish_interval_ms));
    }

    tracing::info!("producer done");

    // deregister before tearing the kernel objects down so peers stop being
    // pointed at a ring that is about to vanish
    drop(participant);
    ring.unlink_resources();
    Ok(())
}
