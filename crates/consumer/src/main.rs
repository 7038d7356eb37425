mod config;

use anyhow::Context;
use common::setup_logging;
use config::ConsumerConfig;
use discovery::{Participant, Role};
use ring::SharedRing;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let config = ConsumerConfig::from_env()?;
    setup_logging(config.environment);

    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown))?;
    flag::register(SIGINT, Arc::clone(&shutdown))?;

    let participant = Participant::register(
        &config.broker_socket,
        Role::Consumer,
        &config.service,
        None,
    )
    .context("failed to register with the discovery daemon")?;
    participant.set_recv_timeout(Some(Duration::from_millis(500)))?;

    tracing::info!(service = %config.service, "registered; waiting for peers");

    let mut scratch = Vec::new();
    while !shutdown.load(Ordering::Relaxed) {
        let Some(peer) = participant.recv_peer()? else {
            continue;
        };
        tracing::info!(
            service = %peer.service,
            address = %peer.address,
            ring = %peer.ring.as_deref().unwrap_or("-"),
            "peer notification"
        );

        // only peers that offer a ring are worth attaching to
        let Some(ring_name) = peer.ring else {
            continue;
        };

        let mut ring = match SharedRing::open_when_ready(&ring_name) {
            Ok(ring) => ring,
            Err(e) => {
                tracing::error!(ring = %ring_name, "could not attach: {e}");
                continue;
            }
        };
        tracing::info!(
            ring = %ring_name,
            slots = ring.slot_count(),
            slot_size = ring.slot_size(),
            "attached"
        );

        while !shutdown.load(Ordering::Relaxed) {
            match ring.read_message(&mut scratch) {
                Ok(()) => {
                    tracing::info!(message = %String::from_utf8_lossy(&scratch), "read")
                }
                Err(e) => {
                    tracing::warn!("read failed: {e}");
                    break;
                }
            }
        }
    }

    Ok(())
}
