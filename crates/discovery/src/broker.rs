//! The discovery broker: a registry of participants keyed by service,
//! fed by REGISTER/DEREGISTER datagrams and answering with PEER notices.

use crate::errors::DiscoveryError;
use crate::protocol::{PeerNotice, Registration, Request, MAX_DATAGRAM_LEN};
use std::collections::HashMap;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How long `run` sleeps in the kernel before re-checking the shutdown flag.
const RECV_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Upper bound on one peer notification send. A client whose receive buffer
/// is full loses the notice rather than stalling the registry.
const SEND_TIMEOUT: Duration = Duration::from_millis(50);

pub struct Broker {
    socket: UnixDatagram,
    socket_path: PathBuf,
    registry: HashMap<String, Vec<Registration>>,
}

impl Broker {
    /// Bind the broker socket at `path`, replacing a stale socket file from
    /// a previous run.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, DiscoveryError> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let socket = UnixDatagram::bind(path)?;
        socket.set_read_timeout(Some(RECV_POLL_INTERVAL))?;
        socket.set_write_timeout(Some(SEND_TIMEOUT))?;
        Ok(Self {
            socket,
            socket_path: path.to_path_buf(),
            registry: HashMap::new(),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve requests until `shutdown` is set.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), DiscoveryError> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        while !shutdown.load(Ordering::Relaxed) {
            let received = match self.socket.recv(&mut buf) {
                Ok(n) => n,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            };
            self.handle_datagram(&buf[..received]);
        }
        tracing::info!("broker shutting down");
        Ok(())
    }

    fn handle_datagram(&mut self, datagram: &[u8]) {
        match Request::parse(datagram) {
            Ok(Request::Register(registration)) => self.register(registration),
            Ok(Request::Deregister(registration)) => self.deregister(&registration),
            Err(e) => tracing::warn!("ignoring datagram: {e}"),
        }
    }

    /// Tell the newcomer about every existing participant under the key,
    /// tell every existing participant about the newcomer, then record it.
    fn register(&mut self, registration: Registration) {
        tracing::info!(
            service = %registration.service,
            address = %registration.address,
            ring = %registration.ring.as_deref().unwrap_or("-"),
            "register"
        );

        let peers = self.registry.entry(registration.service.clone()).or_default();

        for peer in peers.iter() {
            let notice = PeerNotice {
                service: registration.service.clone(),
                address: peer.address.clone(),
                ring: peer.ring.clone(),
            };
            Self::notify(&self.socket, &registration.address, &notice);
        }

        for peer in peers.iter() {
            if peer.address == registration.address {
                continue;
            }
            let notice = PeerNotice {
                service: registration.service.clone(),
                address: registration.address.clone(),
                ring: registration.ring.clone(),
            };
            Self::notify(&self.socket, &peer.address, &notice);
        }

        peers.push(registration);
    }

    fn deregister(&mut self, registration: &Registration) {
        tracing::info!(
            service = %registration.service,
            address = %registration.address,
            "deregister"
        );
        if let Some(peers) = self.registry.get_mut(&registration.service) {
            peers.retain(|peer| peer.address != registration.address);
            if peers.is_empty() {
                self.registry.remove(&registration.service);
            }
        }
    }

    /// Fire-and-forget: a notification that cannot be delivered (the peer's
    /// socket path is gone, its buffer is full) is logged and dropped. The
    /// registry is never mutated on a send failure.
    fn notify(socket: &UnixDatagram, to: &str, notice: &PeerNotice) {
        let payload = notice.to_string();
        if let Err(e) = socket.send_to(payload.as_bytes(), to) {
            tracing::debug!(peer = %to, "dropping peer notification: {e}");
        }
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
